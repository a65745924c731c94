// src/services/contact_service.rs

use std::sync::Arc;

use chrono::Local;
use serde_json::Map;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    import::reconciler::{self, ReconcileOutcome},
    models::{
        contacts::{identity_key, Contact, ContactStatus, ContactsDocument},
        import::{ColumnMapping, DecodedRow},
        presence::ActorContext,
    },
    sync::SyncedStore,
};

// Campos editáveis de um contato (tudo menos id, status e lastContactDate,
// que têm ações próprias).
#[derive(Debug, Clone)]
pub struct ContactDraft {
    pub category_name: String,
    pub title: String,
    pub city: String,
    pub phone: String,
    pub url: String,
    pub instagram: String,
    pub leads: String,
    pub notes: Option<String>,
}

#[derive(Clone)]
pub struct ContactService {
    store: Arc<SyncedStore<ContactsDocument>>,
}

impl ContactService {
    pub fn new(store: Arc<SyncedStore<ContactsDocument>>) -> Self {
        Self { store }
    }

    pub async fn list(&self) -> Vec<Contact> {
        self.store.snapshot().await.contacts
    }

    // Toda mutação passa pelo mesmo caminho: lista nova -> update otimista do
    // campo "contacts" por atacado (last-write-wins, como no frontend).
    async fn save(
        &self,
        contacts: Vec<Contact>,
        actor: &ActorContext,
    ) -> Result<ContactsDocument, AppError> {
        let mut partial = Map::new();
        partial.insert(
            "contacts".to_string(),
            serde_json::to_value(contacts).map_err(|e| AppError::PayloadInvalid(e.to_string()))?,
        );
        self.store.update(partial, actor).await
    }

    pub async fn add(&self, draft: ContactDraft, actor: &ActorContext) -> Result<Contact, AppError> {
        let mut contacts = self.list().await;

        let key = identity_key(&draft.title, &draft.phone);
        if contacts.iter().any(|c| c.identity_key() == key) {
            return Err(AppError::ContactAlreadyExists);
        }

        let contact = Contact {
            id: Uuid::new_v4().to_string(),
            category_name: draft.category_name,
            title: draft.title,
            city: draft.city,
            phone: draft.phone,
            url: draft.url,
            instagram: draft.instagram,
            leads: draft.leads,
            status: ContactStatus::NotContacted,
            notes: draft.notes,
            last_contact_date: None,
        };
        contacts.push(contact.clone());
        self.save(contacts, actor).await?;
        Ok(contact)
    }

    pub async fn edit(
        &self,
        id: &str,
        draft: ContactDraft,
        actor: &ActorContext,
    ) -> Result<Contact, AppError> {
        let mut contacts = self.list().await;

        let key = identity_key(&draft.title, &draft.phone);
        if contacts.iter().any(|c| c.id != id && c.identity_key() == key) {
            return Err(AppError::ContactAlreadyExists);
        }

        let contact = contacts
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(AppError::ContactNotFound)?;
        contact.category_name = draft.category_name;
        contact.title = draft.title;
        contact.city = draft.city;
        contact.phone = draft.phone;
        contact.url = draft.url;
        contact.instagram = draft.instagram;
        contact.leads = draft.leads;
        contact.notes = draft.notes;
        let updated = contact.clone();

        self.save(contacts, actor).await?;
        Ok(updated)
    }

    // Muda o status e carimba a data do contato (dd/mm/aaaa, como o frontend
    // sempre gravou). Voltar para "não contatado" limpa o carimbo.
    pub async fn set_status(
        &self,
        id: &str,
        status: ContactStatus,
        actor: &ActorContext,
    ) -> Result<Contact, AppError> {
        let mut contacts = self.list().await;
        let contact = contacts
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(AppError::ContactNotFound)?;

        contact.status = status;
        contact.last_contact_date = if status == ContactStatus::NotContacted {
            None
        } else {
            Some(Local::now().format("%d/%m/%Y").to_string())
        };
        let updated = contact.clone();

        self.save(contacts, actor).await?;
        tracing::info!("Status atualizado para: {}", updated.status.label());
        Ok(updated)
    }

    pub async fn delete(&self, id: &str, actor: &ActorContext) -> Result<(), AppError> {
        let mut contacts = self.list().await;
        let before = contacts.len();
        contacts.retain(|c| c.id != id);
        if contacts.len() == before {
            return Err(AppError::ContactNotFound);
        }
        self.save(contacts, actor).await?;
        Ok(())
    }

    // Executa a reconciliação contra o que está salvo e anexa os aceitos.
    pub async fn import(
        &self,
        rows: &[DecodedRow],
        mapping: &ColumnMapping,
        actor: &ActorContext,
    ) -> Result<ReconcileOutcome, AppError> {
        let mut contacts = self.list().await;
        let outcome = reconciler::reconcile(rows, mapping, &contacts)?;

        if !outcome.accepted.is_empty() {
            contacts.extend(outcome.accepted.iter().cloned());
            self.save(contacts, actor).await?;
        }
        Ok(outcome)
    }
}
