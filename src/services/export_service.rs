// src/services/export_service.rs

use rust_decimal::prelude::ToPrimitive;
use rust_xlsxwriter::{Workbook, Worksheet};

use crate::{
    common::error::AppError,
    models::dashboard::{DashboardData, IndicatorStatus},
};

// Export do dashboard em um workbook de seis abas, com os mesmos nomes de
// aba, cabeçalhos e rótulos de status que o export original. Mão única:
// o arquivo baixado não realimenta o núcleo.
pub fn export_dashboard(data: &DashboardData) -> Result<Vec<u8>, AppError> {
    let mut workbook = Workbook::new();

    // 1. Indicadores
    let sheet = workbook.add_worksheet();
    sheet.set_name("Indicadores")?;
    write_header(sheet, &["Indicador", "Valor", "Meta", "Status"])?;
    for (row, ind) in data.indicators.iter().enumerate() {
        let row = (row + 1) as u32;
        sheet.write_string(row, 0, &ind.name)?;
        sheet.write_number(row, 1, ind.value)?;
        sheet.write_number(row, 2, ind.goal)?;
        sheet.write_string(row, 3, status_label(ind.status))?;
    }

    // 2. Metas de Faturamento
    let sheet = workbook.add_worksheet();
    sheet.set_name("Metas de Faturamento")?;
    write_header(sheet, &["Plano", "Meta Semanal (R$)", "Meta Mensal (R$)", "Progresso (%)"])?;
    for (row, goal) in data.revenue_goals.iter().enumerate() {
        let row = (row + 1) as u32;
        sheet.write_string(row, 0, &goal.plan)?;
        sheet.write_number(row, 1, goal.weekly_goal.to_f64().unwrap_or(0.0))?;
        sheet.write_number(row, 2, goal.monthly_goal.to_f64().unwrap_or(0.0))?;
        sheet.write_number(row, 3, goal.progress as f64)?;
    }

    // 3. Leads Qualificados
    let sheet = workbook.add_worksheet();
    sheet.set_name("Leads Qualificados")?;
    write_header(
        sheet,
        &["Nome", "Empresa", "Instagram", "Telefone", "Origem", "Status", "Último Contato", "Responsável"],
    )?;
    for (row, lead) in data.qualified_leads.iter().enumerate() {
        let row = (row + 1) as u32;
        sheet.write_string(row, 0, &lead.name)?;
        sheet.write_string(row, 1, &lead.company)?;
        sheet.write_string(row, 2, &lead.instagram)?;
        sheet.write_string(row, 3, &lead.phone)?;
        sheet.write_string(row, 4, &lead.source)?;
        sheet.write_string(row, 5, &lead.status)?;
        sheet.write_string(row, 6, &lead.last_contact)?;
        sheet.write_string(row, 7, &lead.responsible)?;
    }

    // 4. Resumo de Reuniões
    let sheet = workbook.add_worksheet();
    sheet.set_name("Resumo de Reuniões")?;
    write_header(
        sheet,
        &["Semana", "Reuniões Agendadas", "Reuniões Realizadas", "Taxa de Comparecimento (%)"],
    )?;
    for (row, summary) in data.meeting_summaries.iter().enumerate() {
        let row = (row + 1) as u32;
        sheet.write_number(row, 0, summary.week as f64)?;
        sheet.write_number(row, 1, summary.scheduled as f64)?;
        sheet.write_number(row, 2, summary.completed as f64)?;
        sheet.write_number(row, 3, summary.attendance_rate as f64)?;
    }

    // 5. Remarketing
    let sheet = workbook.add_worksheet();
    sheet.set_name("Remarketing")?;
    write_header(sheet, &["Nome", "Origem", "Motivo da Perda", "Próxima Ação", "Data para Reabordar"])?;
    for (row, lead) in data.remarketing_leads.iter().enumerate() {
        let row = (row + 1) as u32;
        sheet.write_string(row, 0, &lead.name)?;
        sheet.write_string(row, 1, &lead.source)?;
        sheet.write_string(row, 2, &lead.loss_reason)?;
        sheet.write_string(row, 3, &lead.next_action)?;
        sheet.write_string(row, 4, &lead.next_contact_date)?;
    }

    // 6. Informações Gerais
    let sheet = workbook.add_worksheet();
    sheet.set_name("Informações Gerais")?;
    write_header(sheet, &["Chave", "Valor"])?;
    let general = [
        ("Mês de Referência", data.reference_month.as_str()),
        ("Responsável pela Atualização", data.responsible_person.as_str()),
        ("Observações Estratégicas", data.strategic_notes.as_str()),
    ];
    for (row, (key, value)) in general.iter().enumerate() {
        let row = (row + 1) as u32;
        sheet.write_string(row, 0, *key)?;
        sheet.write_string(row, 1, *value)?;
    }

    Ok(workbook.save_to_buffer()?)
}

pub fn export_file_name(data: &DashboardData) -> String {
    format!("Dashboard_CRM_{}.xlsx", data.reference_month.replace(' ', "_"))
}

fn write_header(sheet: &mut Worksheet, titles: &[&str]) -> Result<(), AppError> {
    for (col, title) in titles.iter().enumerate() {
        sheet.write_string(0, col as u16, *title)?;
    }
    Ok(())
}

fn status_label(status: Option<IndicatorStatus>) -> &'static str {
    match status {
        Some(IndicatorStatus::Success) => "✅ Meta Atingida",
        Some(IndicatorStatus::Warning) => "⚠️ Em Andamento",
        _ => "❌ Meta Não Atingida",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::{open_workbook_auto_from_rs, Reader};
    use std::io::Cursor;

    use crate::sync::store::SyncDocument;

    #[test]
    fn exporta_as_seis_abas_com_os_nomes_originais() {
        let mut data = DashboardData::default();
        data.derive();
        let bytes = export_dashboard(&data).unwrap();

        let workbook = open_workbook_auto_from_rs(Cursor::new(bytes)).unwrap();
        let names = workbook.sheet_names();
        assert_eq!(
            names,
            vec![
                "Indicadores",
                "Metas de Faturamento",
                "Leads Qualificados",
                "Resumo de Reuniões",
                "Remarketing",
                "Informações Gerais",
            ]
        );
    }

    #[test]
    fn aba_de_indicadores_carrega_os_rotulos_de_status() {
        let mut data = DashboardData::default();
        data.derive();
        let bytes = export_dashboard(&data).unwrap();

        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes)).unwrap();
        let range = workbook.worksheet_range("Indicadores").unwrap();
        let mut rows = range.rows();
        let header: Vec<String> = rows.next().unwrap().iter().map(|c| c.to_string()).collect();
        assert_eq!(header, vec!["Indicador", "Valor", "Meta", "Status"]);

        // 85/100 -> warning -> "⚠️ Em Andamento"
        let first: Vec<String> = rows.next().unwrap().iter().map(|c| c.to_string()).collect();
        assert_eq!(first[0], "Total de Leads Gerados");
        assert_eq!(first[3], "⚠️ Em Andamento");
    }

    #[test]
    fn nome_do_arquivo_usa_o_mes_de_referencia() {
        let data = DashboardData::default();
        assert_eq!(export_file_name(&data), "Dashboard_CRM_Abril_2025.xlsx");
    }
}
