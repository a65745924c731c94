// src/models/contacts.rs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::sync::store::SyncDocument;

// Status de atendimento de um contato. Os rótulos serializados são os mesmos
// que o frontend sempre gravou no banco ("não contatado", "atendeu", ...),
// então documentos antigos continuam legíveis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
pub enum ContactStatus {
    #[default]
    #[serde(rename = "não contatado")]
    NotContacted,
    #[serde(rename = "atendeu")]
    Answered,
    #[serde(rename = "não atendeu")]
    NoAnswer,
    #[serde(rename = "ligar novamente")]
    CallAgain,
    #[serde(rename = "outro horário")]
    AnotherTime,
    #[serde(rename = "lead ruim")]
    BadLead,
}

impl ContactStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ContactStatus::NotContacted => "não contatado",
            ContactStatus::Answered => "atendeu",
            ContactStatus::NoAnswer => "não atendeu",
            ContactStatus::CallAgain => "ligar novamente",
            ContactStatus::AnotherTime => "outro horário",
            ContactStatus::BadLead => "lead ruim",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    // Opaco, gerado na criação, estável pela vida do registro
    pub id: String,

    pub category_name: String,
    pub title: String,
    pub city: String,
    pub phone: String,

    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub instagram: String,
    #[serde(default)]
    pub leads: String,

    #[serde(default)]
    pub status: ContactStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    // Preenchido apenas quando o status sai de "não contatado" (dd/mm/aaaa)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_contact_date: Option<String>,
}

impl Contact {
    // Chave de identidade usada na detecção de duplicados: (título, telefone).
    pub fn identity_key(&self) -> String {
        identity_key(&self.title, &self.phone)
    }
}

pub fn identity_key(title: &str, phone: &str) -> String {
    format!("{}-{}", title, phone)
}

// O documento replicado inteiro. Um único campo de topo: edições concorrentes
// na lista são last-write-wins por atacado, como no frontend original.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContactsDocument {
    #[serde(default)]
    pub contacts: Vec<Contact>,
}

impl SyncDocument for ContactsDocument {
    const PATH: &'static str = "contacts";
}
