// src/import/reconciler.rs

use std::collections::HashSet;

use chrono::Utc;

use crate::common::error::AppError;
use crate::import::mapper;
use crate::models::contacts::{identity_key, Contact, ContactStatus};
use crate::models::import::{ColumnMapping, DecodedRow, ImportField};

// Resultado da reconciliação. `duplicate_count` cobre duplicados dentro do
// lote e contra o que já está salvo; linhas sem título/telefone são um motivo
// distinto e ficam em `missing_required` para não contaminar a contagem.
#[derive(Debug, Clone, Default)]
pub struct ReconcileOutcome {
    pub accepted: Vec<Contact>,
    pub duplicate_count: usize,
    pub missing_required: usize,
}

// Transforma (linhas decodificadas, mapeamento, contatos existentes) nos
// registros aceitos:
//   1. mapeamento incompleto -> erro, nada é importado
//   2. linha sem título ou telefone não forma chave de identidade -> descartada
//   3. primeira ocorrência de cada (título, telefone) no lote vence
//   4. chave que já existe no armazenamento -> descartada
//   5. aceitos ganham id novo (timestamp + índice da linha) e status padrão
pub fn reconcile(
    rows: &[DecodedRow],
    mapping: &ColumnMapping,
    existing: &[Contact],
) -> Result<ReconcileOutcome, AppError> {
    let missing = mapper::validate(mapping);
    if !missing.is_empty() {
        return Err(AppError::MappingIncomplete(missing));
    }

    let cell = |row: &DecodedRow, field: ImportField| -> String {
        mapping
            .get(field)
            .and_then(|header| row.get(header))
            .map(|value| value.trim().to_string())
            .unwrap_or_default()
    };

    let mut outcome = ReconcileOutcome::default();
    let mut seen: HashSet<String> = existing.iter().map(Contact::identity_key).collect();
    let mut candidates = 0usize;

    let id_base = Utc::now().timestamp_millis();

    for (index, row) in rows.iter().enumerate() {
        let title = cell(row, ImportField::Title);
        let phone = cell(row, ImportField::Phone);

        if title.is_empty() || phone.is_empty() {
            outcome.missing_required += 1;
            continue;
        }
        candidates += 1;

        let key = identity_key(&title, &phone);
        if !seen.insert(key) {
            continue;
        }

        outcome.accepted.push(Contact {
            id: (id_base + index as i64).to_string(),
            category_name: cell(row, ImportField::CategoryName),
            title,
            city: cell(row, ImportField::City),
            phone,
            url: cell(row, ImportField::Url),
            instagram: cell(row, ImportField::Instagram),
            leads: cell(row, ImportField::Leads),
            status: ContactStatus::NotContacted,
            notes: None,
            last_contact_date: None,
        });
    }

    outcome.duplicate_count = candidates - outcome.accepted.len();
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn mapping() -> ColumnMapping {
        ColumnMapping {
            category_name: Some("Categoria".to_string()),
            title: Some("Titulo".to_string()),
            city: Some("Cidade".to_string()),
            phone: Some("Fone".to_string()),
            url: None,
            instagram: None,
            leads: None,
        }
    }

    fn row(pairs: &[(&str, &str)]) -> DecodedRow {
        let cells: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        DecodedRow { cells }
    }

    fn clinica(titulo: &str, fone: &str) -> DecodedRow {
        row(&[("Categoria", "Clínica"), ("Titulo", titulo), ("Cidade", "SP"), ("Fone", fone)])
    }

    fn existing(title: &str, phone: &str) -> Contact {
        Contact {
            id: "x".to_string(),
            category_name: "Clínica".to_string(),
            title: title.to_string(),
            city: "SP".to_string(),
            phone: phone.to_string(),
            url: String::new(),
            instagram: String::new(),
            leads: String::new(),
            status: ContactStatus::NotContacted,
            notes: None,
            last_contact_date: None,
        }
    }

    #[test]
    fn par_duplicado_no_lote_deixa_um_e_conta_um() {
        // cenário da planilha ["Categoria","Titulo","Cidade","Fone"]
        let rows = vec![clinica("A", "111"), clinica("A", "111")];
        let outcome = reconcile(&rows, &mapping(), &[]).unwrap();

        assert_eq!(outcome.accepted.len(), 1);
        assert_eq!(outcome.duplicate_count, 1);
        assert_eq!(outcome.missing_required, 0);
        assert_eq!(outcome.accepted[0].title, "A");
        assert_eq!(outcome.accepted[0].status, ContactStatus::NotContacted);
    }

    #[test]
    fn primeira_ocorrencia_do_lote_vence() {
        let mut primeiro = clinica("A", "111");
        primeiro.cells.insert("Cidade".to_string(), "Campinas".to_string());
        let rows = vec![primeiro, clinica("A", "111")];
        let outcome = reconcile(&rows, &mapping(), &[]).unwrap();
        assert_eq!(outcome.accepted[0].city, "Campinas");
    }

    #[test]
    fn deduplica_contra_os_ja_salvos() {
        let rows = vec![clinica("A", "111"), clinica("B", "222")];
        let stored = vec![existing("A", "111")];
        let outcome = reconcile(&rows, &mapping(), &stored).unwrap();

        assert_eq!(outcome.accepted.len(), 1);
        assert_eq!(outcome.accepted[0].title, "B");
        assert_eq!(outcome.duplicate_count, 1);
    }

    #[test]
    fn linha_sem_titulo_ou_fone_nao_vira_duplicado() {
        let rows = vec![
            clinica("A", "111"),
            row(&[("Categoria", "Clínica"), ("Cidade", "SP"), ("Fone", "333")]), // sem título
            row(&[("Categoria", "Clínica"), ("Titulo", "C"), ("Cidade", "SP")]), // sem fone
        ];
        let outcome = reconcile(&rows, &mapping(), &[]).unwrap();

        assert_eq!(outcome.accepted.len(), 1);
        assert_eq!(outcome.duplicate_count, 0);
        assert_eq!(outcome.missing_required, 2);
    }

    #[test]
    fn nunca_emite_registro_sem_titulo_ou_fone() {
        let rows = vec![
            clinica("A", "111"),
            clinica("", "222"),
            clinica("D", ""),
            clinica("E", "555"),
        ];
        let outcome = reconcile(&rows, &mapping(), &[]).unwrap();
        assert!(outcome
            .accepted
            .iter()
            .all(|c| !c.title.is_empty() && !c.phone.is_empty()));
        assert_eq!(outcome.accepted.len(), 2);
    }

    #[test]
    fn lote_vazio_aceita_zero_sem_erro() {
        let outcome = reconcile(&[], &mapping(), &[]).unwrap();
        assert!(outcome.accepted.is_empty());
        assert_eq!(outcome.duplicate_count, 0);
        assert_eq!(outcome.missing_required, 0);
    }

    #[test]
    fn todos_duplicados_aceita_zero_e_conta_todos() {
        let stored = vec![existing("A", "111"), existing("B", "222")];
        let rows = vec![clinica("A", "111"), clinica("B", "222")];
        let outcome = reconcile(&rows, &mapping(), &stored).unwrap();
        assert!(outcome.accepted.is_empty());
        assert_eq!(outcome.duplicate_count, 2);
    }

    #[test]
    fn opcional_sem_mapeamento_vira_string_vazia() {
        let rows = vec![clinica("A", "111")];
        let outcome = reconcile(&rows, &mapping(), &[]).unwrap();
        assert_eq!(outcome.accepted[0].url, "");
        assert_eq!(outcome.accepted[0].instagram, "");
        assert_eq!(outcome.accepted[0].leads, "");
    }

    #[test]
    fn mapeamento_incompleto_rejeita_tudo() {
        let mut incomplete = mapping();
        incomplete.phone = None;
        let err = reconcile(&[clinica("A", "111")], &incomplete, &[]).unwrap_err();
        assert!(matches!(err, AppError::MappingIncomplete(ref m) if m == &vec!["phone".to_string()]));
    }

    #[test]
    fn ids_sao_unicos_dentro_da_importacao() {
        let rows = vec![clinica("A", "111"), clinica("B", "222"), clinica("C", "333")];
        let outcome = reconcile(&rows, &mapping(), &[]).unwrap();
        let ids: HashSet<_> = outcome.accepted.iter().map(|c| c.id.clone()).collect();
        assert_eq!(ids.len(), 3);
    }
}
