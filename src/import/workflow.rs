// src/import/workflow.rs

use dashmap::DashMap;
use uuid::Uuid;

use crate::common::error::AppError;
use crate::import::{decoder, mapper};
use crate::models::import::{ColumnMapping, DecodedRow, DecodedSheet, ImportField};

// O fluxo do diálogo de importação como máquina de estados explícita,
// independente de UI:
//
//   FileSelected -> Mapped -> Importing -> Done | Failed
//
// (o "Idle" é a ausência da sessão no registro). Uma sessão morre no
// confirm ou no cancelamento; Failed fica viva para remapear e tentar de novo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportState {
    FileSelected,
    Mapped,
    Importing,
    Done,
    Failed,
}

impl ImportState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportState::FileSelected => "fileSelected",
            ImportState::Mapped => "mapped",
            ImportState::Importing => "importing",
            ImportState::Done => "done",
            ImportState::Failed => "failed",
        }
    }
}

#[derive(Debug)]
pub struct ImportSession {
    pub id: Uuid,
    pub file_name: String,
    pub state: ImportState,
    pub sheet: DecodedSheet,
    pub mapping: ColumnMapping,
}

impl ImportSession {
    // Upload do arquivo: decodifica e já propõe o mapeamento automático.
    pub fn from_upload(file_name: String, bytes: &[u8]) -> Result<Self, AppError> {
        let sheet = decoder::decode_workbook(bytes)?;
        let mapping = mapper::auto_map(&sheet.headers);
        let state = if mapper::complete(&mapping) {
            ImportState::Mapped
        } else {
            ImportState::FileSelected
        };
        Ok(Self {
            id: Uuid::new_v4(),
            file_name,
            state,
            sheet,
            mapping,
        })
    }

    // Amostra exibida no diálogo, como no frontend (três primeiras linhas)
    pub fn preview(&self) -> &[DecodedRow] {
        let len = self.sheet.rows.len().min(3);
        &self.sheet.rows[..len]
    }

    // Sobrescreve um campo do mapeamento (None limpa). Permitido enquanto a
    // importação não está rodando; ajustar o mapeamento de uma sessão Failed
    // a traz de volta para o caminho feliz.
    pub fn set_mapping(&mut self, field: ImportField, header: Option<String>) -> Result<(), AppError> {
        match self.state {
            ImportState::FileSelected | ImportState::Mapped | ImportState::Failed => {}
            ImportState::Importing | ImportState::Done => {
                return Err(AppError::ImportStateInvalid(self.state.as_str()));
            }
        }
        if let Some(ref header) = header {
            if !mapper::header_exists(&self.sheet.headers, header) {
                return Err(AppError::PayloadInvalid(format!(
                    "a planilha não tem a coluna '{header}'"
                )));
            }
        }
        self.mapping.set(field, header);
        self.state = if mapper::complete(&self.mapping) {
            ImportState::Mapped
        } else {
            ImportState::FileSelected
        };
        Ok(())
    }

    // Confirmação: sai de Mapped (ou de Failed, num retry). Valida de novo na
    // fronteira — a lista de obrigatórios faltantes é o erro que o usuário vê.
    pub fn begin_import(&mut self) -> Result<(), AppError> {
        let missing = mapper::validate(&self.mapping);
        if !missing.is_empty() {
            return Err(AppError::MappingIncomplete(missing));
        }
        if !matches!(self.state, ImportState::Mapped | ImportState::Failed) {
            return Err(AppError::ImportStateInvalid(self.state.as_str()));
        }
        self.state = ImportState::Importing;
        Ok(())
    }
}

// Sessões em andamento, uma por diálogo aberto em algum cliente.
#[derive(Default)]
pub struct ImportRegistry {
    sessions: DashMap<Uuid, ImportSession>,
}

impl ImportRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, session: ImportSession) {
        self.sessions.insert(session.id, session);
    }

    pub fn with_session<R>(
        &self,
        id: Uuid,
        f: impl FnOnce(&mut ImportSession) -> Result<R, AppError>,
    ) -> Result<R, AppError> {
        let mut entry = self
            .sessions
            .get_mut(&id)
            .ok_or(AppError::ImportSessionNotFound)?;
        f(&mut entry)
    }

    // Retira a sessão do registro para rodar a importação sem segurar o lock
    // do mapa através de awaits.
    pub fn take(&self, id: Uuid) -> Result<ImportSession, AppError> {
        self.sessions
            .remove(&id)
            .map(|(_, session)| session)
            .ok_or(AppError::ImportSessionNotFound)
    }

    pub fn cancel(&self, id: Uuid) -> Result<(), AppError> {
        self.sessions
            .remove(&id)
            .map(|_| ())
            .ok_or(AppError::ImportSessionNotFound)
    }
}
