// src/import/mapper.rs

use crate::models::import::{ColumnMapping, ImportField, REQUIRED_FIELDS};

// Heurísticas de sugestão: substring no nome do cabeçalho, sem caixa.
// São só sugestões — o usuário pode sobrescrever qualquer campo.
const HEURISTICS: [(ImportField, &[&str]); 7] = [
    (ImportField::CategoryName, &["categ"]),
    (ImportField::Title, &["titul", "nome"]),
    (ImportField::City, &["cidad"]),
    (ImportField::Phone, &["tele", "fone"]),
    (ImportField::Url, &["url", "site"]),
    (ImportField::Instagram, &["insta"]),
    (ImportField::Leads, &["lead"]),
];

// Propõe um mapeamento inicial a partir dos cabeçalhos do arquivo. Cada
// cabeçalho é usado no máximo uma vez; o primeiro que casar leva.
pub fn auto_map(headers: &[String]) -> ColumnMapping {
    let mut mapping = ColumnMapping::default();
    let mut used: Vec<&str> = Vec::new();

    for (field, patterns) in HEURISTICS {
        let found = headers.iter().find(|header| {
            let lower = header.to_lowercase();
            !used.contains(&header.as_str())
                && patterns.iter().any(|pattern| lower.contains(pattern))
        });
        if let Some(header) = found {
            used.push(header.as_str());
            mapping.set(field, Some(header.clone()));
        }
    }

    mapping
}

// Campos obrigatórios sem coluna: a importação inteira é rejeitada enquanto
// essa lista não estiver vazia.
pub fn validate(mapping: &ColumnMapping) -> Vec<String> {
    REQUIRED_FIELDS
        .iter()
        .filter(|field| mapping.get(**field).is_none())
        .map(|field| field.as_str().to_string())
        .collect()
}

// O mapeamento só pode apontar para cabeçalhos que existem no arquivo.
pub fn header_exists(headers: &[String], header: &str) -> bool {
    headers.iter().any(|h| h == header)
}

pub fn complete(mapping: &ColumnMapping) -> bool {
    validate(mapping).is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn sugere_mapeamento_para_cabecalhos_em_portugues() {
        let mapping = auto_map(&headers(&["Categoria", "Titulo", "Cidade", "Fone"]));
        assert_eq!(mapping.category_name.as_deref(), Some("Categoria"));
        assert_eq!(mapping.title.as_deref(), Some("Titulo"));
        assert_eq!(mapping.city.as_deref(), Some("Cidade"));
        assert_eq!(mapping.phone.as_deref(), Some("Fone"));
        assert!(mapping.url.is_none());
        assert!(validate(&mapping).is_empty());
    }

    #[test]
    fn sugestao_ignora_caixa_e_cobre_opcionais() {
        let mapping = auto_map(&headers(&[
            "CATEGORIA", "Nome do Negócio", "cidade", "Telefone", "Site", "Instagram", "Leads",
        ]));
        assert_eq!(mapping.title.as_deref(), Some("Nome do Negócio"));
        assert_eq!(mapping.phone.as_deref(), Some("Telefone"));
        assert_eq!(mapping.url.as_deref(), Some("Site"));
        assert_eq!(mapping.instagram.as_deref(), Some("Instagram"));
        assert_eq!(mapping.leads.as_deref(), Some("Leads"));
    }

    #[test]
    fn cada_cabecalho_e_usado_no_maximo_uma_vez() {
        // "Nome" casaria com title; sem outro candidato, leads fica vazio
        let mapping = auto_map(&headers(&["Nome"]));
        assert_eq!(mapping.title.as_deref(), Some("Nome"));
        assert!(mapping.leads.is_none());
    }

    #[test]
    fn validate_lista_os_obrigatorios_faltantes() {
        let mut mapping = auto_map(&headers(&["Categoria", "Titulo"]));
        let missing = validate(&mapping);
        assert_eq!(missing, vec!["city".to_string(), "phone".to_string()]);

        mapping.set(ImportField::City, Some("Cidade".to_string()));
        mapping.set(ImportField::Phone, Some("Fone".to_string()));
        assert!(validate(&mapping).is_empty());

        // limpar um obrigatório volta a invalidar
        mapping.set(ImportField::Phone, None);
        assert_eq!(validate(&mapping), vec!["phone".to_string()]);
    }
}
