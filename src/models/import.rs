// src/models/import.rs

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// Os sete campos lógicos de um contato que podem vir da planilha.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum ImportField {
    CategoryName,
    Title,
    City,
    Phone,
    Url,
    Instagram,
    Leads,
}

// Campos sem os quais a linha não forma uma chave de identidade / registro válido
pub const REQUIRED_FIELDS: [ImportField; 4] = [
    ImportField::CategoryName,
    ImportField::Title,
    ImportField::City,
    ImportField::Phone,
];

impl ImportField {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportField::CategoryName => "categoryName",
            ImportField::Title => "title",
            ImportField::City => "city",
            ImportField::Phone => "phone",
            ImportField::Url => "url",
            ImportField::Instagram => "instagram",
            ImportField::Leads => "leads",
        }
    }
}

// Mapeamento campo lógico -> cabeçalho da planilha. Só tem significado dentro
// de uma sessão de importação; é descartado quando ela termina ou é cancelada.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ColumnMapping {
    pub category_name: Option<String>,
    pub title: Option<String>,
    pub city: Option<String>,
    pub phone: Option<String>,
    pub url: Option<String>,
    pub instagram: Option<String>,
    pub leads: Option<String>,
}

impl ColumnMapping {
    pub fn get(&self, field: ImportField) -> Option<&str> {
        match field {
            ImportField::CategoryName => self.category_name.as_deref(),
            ImportField::Title => self.title.as_deref(),
            ImportField::City => self.city.as_deref(),
            ImportField::Phone => self.phone.as_deref(),
            ImportField::Url => self.url.as_deref(),
            ImportField::Instagram => self.instagram.as_deref(),
            ImportField::Leads => self.leads.as_deref(),
        }
    }

    // Sempre sobrescreve, inclusive limpando para "não mapeado" com None.
    pub fn set(&mut self, field: ImportField, header: Option<String>) {
        let slot = match field {
            ImportField::CategoryName => &mut self.category_name,
            ImportField::Title => &mut self.title,
            ImportField::City => &mut self.city,
            ImportField::Phone => &mut self.phone,
            ImportField::Url => &mut self.url,
            ImportField::Instagram => &mut self.instagram,
            ImportField::Leads => &mut self.leads,
        };
        *slot = header;
    }
}

// Uma linha decodificada: cabeçalho -> valor da célula (já como texto).
#[derive(Debug, Clone, Default, Serialize)]
pub struct DecodedRow {
    #[serde(flatten)]
    pub cells: HashMap<String, String>,
}

impl DecodedRow {
    pub fn get(&self, header: &str) -> Option<&str> {
        self.cells.get(header).map(|s| s.as_str())
    }
}

// Resultado da decodificação da primeira aba.
#[derive(Debug, Clone, Default)]
pub struct DecodedSheet {
    pub headers: Vec<String>,
    pub rows: Vec<DecodedRow>,
}
