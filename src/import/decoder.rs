// src/import/decoder.rs

use std::collections::HashMap;
use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Reader};

use crate::common::error::AppError;
use crate::models::import::{DecodedRow, DecodedSheet};

// Decodifica o arquivo enviado (xlsx/xls/ods, detectado pelo conteúdo) na
// primeira aba: a primeira linha fornece os cabeçalhos, as demais viram
// registros cabeçalho -> valor. Linhas totalmente vazias são puladas.
pub fn decode_workbook(bytes: &[u8]) -> Result<DecodedSheet, AppError> {
    let cursor = Cursor::new(bytes.to_vec());
    let mut workbook = open_workbook_auto_from_rs(cursor)
        .map_err(|e| AppError::DecodeError(e.to_string()))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| AppError::DecodeError("planilha sem abas".to_string()))?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| AppError::DecodeError(e.to_string()))?;

    let mut rows_iter = range.rows();
    let headers: Vec<String> = rows_iter
        .next()
        .map(|row| row.iter().map(cell_to_string).collect())
        .unwrap_or_default();

    if headers.iter().all(|h| h.is_empty()) {
        return Err(AppError::DecodeError("planilha sem linha de cabeçalho".to_string()));
    }

    let mut rows = Vec::new();
    for row in rows_iter {
        let mut cells = HashMap::new();
        for (idx, cell) in row.iter().enumerate() {
            let Some(header) = headers.get(idx) else { break };
            if header.is_empty() {
                continue;
            }
            let value = cell_to_string(cell);
            if !value.is_empty() {
                cells.insert(header.clone(), value);
            }
        }
        if !cells.is_empty() {
            rows.push(DecodedRow { cells });
        }
    }

    Ok(DecodedSheet { headers, rows })
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        // Display de f64 já descarta o ".0" de inteiros (telefones importam!)
        Data::Int(n) => n.to_string(),
        Data::Float(f) => format!("{}", f),
        Data::Bool(b) => b.to_string(),
        Data::Error(_) => String::new(),
        Data::DateTime(dt) => format!("{}", dt),
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook;

    // Gera um xlsx de verdade em memória para exercitar o caminho completo
    fn workbook_bytes(rows: &[Vec<&str>]) -> Vec<u8> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        for (r, row) in rows.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                worksheet
                    .write_string(r as u32, c as u16, *value)
                    .unwrap();
            }
        }
        workbook.save_to_buffer().unwrap()
    }

    #[test]
    fn decodifica_cabecalhos_e_linhas() {
        let bytes = workbook_bytes(&[
            vec!["Categoria", "Titulo", "Cidade", "Fone"],
            vec!["Clínica", "A", "SP", "111"],
            vec!["Clínica", "B", "RJ", "222"],
        ]);

        let sheet = decode_workbook(&bytes).unwrap();
        assert_eq!(sheet.headers, vec!["Categoria", "Titulo", "Cidade", "Fone"]);
        assert_eq!(sheet.rows.len(), 2);
        assert_eq!(sheet.rows[0].get("Titulo"), Some("A"));
        assert_eq!(sheet.rows[1].get("Fone"), Some("222"));
    }

    #[test]
    fn celulas_numericas_viram_texto_sem_ponto_zero() {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.write_string(0, 0, "Fone").unwrap();
        worksheet.write_number(1, 0, 111.0).unwrap();
        let bytes = workbook.save_to_buffer().unwrap();

        let sheet = decode_workbook(&bytes).unwrap();
        assert_eq!(sheet.rows[0].get("Fone"), Some("111"));
    }

    #[test]
    fn planilha_so_com_cabecalho_tem_zero_linhas() {
        let bytes = workbook_bytes(&[vec!["Categoria", "Titulo"]]);
        let sheet = decode_workbook(&bytes).unwrap();
        assert!(sheet.rows.is_empty());
    }

    #[test]
    fn bytes_invalidos_sao_erro_de_decodificacao() {
        let err = decode_workbook(b"isto nao e uma planilha").unwrap_err();
        assert!(matches!(err, AppError::DecodeError(_)));
    }
}
