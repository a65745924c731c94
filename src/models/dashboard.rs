// src/models/dashboard.rs

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::sync::store::SyncDocument;

// 1. Indicadores (os cards do topo)

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum IndicatorStatus {
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Indicator {
    pub name: String,
    pub value: f64,
    pub goal: f64,
    // Sempre derivado de (value, goal); nunca editado diretamente
    #[serde(default)]
    pub status: Option<IndicatorStatus>,
}

// 2. Metas de faturamento por plano

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RevenueGoal {
    pub plan: String,
    pub weekly_goal: Decimal,
    pub monthly_goal: Decimal,
    // Quando presente, `progress` passa a ser derivado dele
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_value: Option<Decimal>,
    pub progress: u32,
}

// 3. Séries dos gráficos

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyCallData {
    pub week: String,
    pub calls: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MeetingsSalesData {
    pub month: String,
    pub meetings: u32,
    pub sales: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FunnelData {
    pub name: String,
    pub value: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeadSourceData {
    pub source: String,
    pub value: u32,
}

// 4. Leads qualificados e remarketing

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: String,
    pub name: String,
    pub company: String,
    pub instagram: String,
    pub phone: String,
    pub source: String,
    pub status: String,
    pub last_contact: String,
    pub responsible: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MeetingSummary {
    pub week: u32,
    pub scheduled: u32,
    pub completed: u32,
    // Sempre round(completed/scheduled*100), ou 0 com zero agendadas
    #[serde(default)]
    pub attendance_rate: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RemarketingLead {
    pub name: String,
    pub source: String,
    pub loss_reason: String,
    pub next_action: String,
    pub next_contact_date: String,
}

// 5. O documento agregado, replicado como uma unidade

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardData {
    pub reference_month: String,
    pub responsible_person: String,
    pub indicators: Vec<Indicator>,
    pub revenue_goals: Vec<RevenueGoal>,
    pub weekly_call_data: Vec<WeeklyCallData>,
    pub meetings_sales_data: Vec<MeetingsSalesData>,
    pub funnel_data: Vec<FunnelData>,
    pub lead_source_data: Vec<LeadSourceData>,
    pub qualified_leads: Vec<Lead>,
    pub meeting_summaries: Vec<MeetingSummary>,
    pub strategic_notes: String,
    pub remarketing_leads: Vec<RemarketingLead>,
}

// Função para calcular o status dos indicadores automaticamente
pub fn calculate_indicator_status(value: f64, goal: f64) -> IndicatorStatus {
    let percentage = (value / goal) * 100.0;

    if percentage >= 100.0 {
        IndicatorStatus::Success
    } else if percentage >= 80.0 {
        IndicatorStatus::Warning
    } else {
        IndicatorStatus::Error
    }
}

pub fn attendance_rate(scheduled: u32, completed: u32) -> u32 {
    if scheduled == 0 {
        return 0;
    }
    ((completed as f64 / scheduled as f64) * 100.0).round() as u32
}

pub fn revenue_progress(current_value: Decimal, monthly_goal: Decimal) -> u32 {
    if monthly_goal.is_zero() {
        return 0;
    }
    let pct = (current_value * Decimal::from(100u32) / monthly_goal)
        .round()
        .to_u32()
        .unwrap_or(0);
    pct.min(100)
}

impl SyncDocument for DashboardData {
    const PATH: &'static str = "dashboard";

    // Recomputa tudo que é derivado. Idempotente: aplicar duas vezes dá o
    // mesmo documento que aplicar uma.
    fn derive(&mut self) {
        for indicator in &mut self.indicators {
            indicator.status = Some(calculate_indicator_status(indicator.value, indicator.goal));
        }
        for summary in &mut self.meeting_summaries {
            summary.attendance_rate = attendance_rate(summary.scheduled, summary.completed);
        }
        for goal in &mut self.revenue_goals {
            if let Some(current) = goal.current_value {
                goal.progress = revenue_progress(current, goal.monthly_goal);
            }
        }
    }
}

// Dados iniciais do dashboard — gravados no meio de persistência quando ainda
// não existe nenhum snapshot (mesmo seed do frontend de Abril/2025).
impl Default for DashboardData {
    fn default() -> Self {
        let indicator = |name: &str, value: f64, goal: f64| Indicator {
            name: name.to_string(),
            value,
            goal,
            status: None,
        };
        let revenue = |plan: &str, weekly: i64, monthly: i64, progress: u32| RevenueGoal {
            plan: plan.to_string(),
            weekly_goal: Decimal::from(weekly),
            monthly_goal: Decimal::from(monthly),
            current_value: None,
            progress,
        };
        let week = |week: &str, calls: u32| WeeklyCallData { week: week.to_string(), calls };
        let month = |month: &str, meetings: u32, sales: u32| MeetingsSalesData {
            month: month.to_string(),
            meetings,
            sales,
        };
        let funnel = |name: &str, value: u32| FunnelData { name: name.to_string(), value };
        let source = |source: &str, value: u32| LeadSourceData { source: source.to_string(), value };
        let summary = |week: u32, scheduled: u32, completed: u32, rate: u32| MeetingSummary {
            week,
            scheduled,
            completed,
            attendance_rate: rate,
        };

        Self {
            reference_month: "Abril 2025".to_string(),
            responsible_person: "Danilo Silva".to_string(),
            indicators: vec![
                indicator("Total de Leads Gerados", 85.0, 100.0),
                indicator("Ligações Realizadas", 150.0, 120.0),
                indicator("Reuniões Agendadas", 32.0, 40.0),
                indicator("Reuniões Realizadas", 28.0, 35.0),
                indicator("Propostas Enviadas", 22.0, 25.0),
                indicator("Vendas Fechadas", 12.0, 15.0),
                indicator("Taxa de Conversão", 14.0, 15.0),
                indicator("Taxa de Fechamento", 55.0, 50.0),
            ],
            revenue_goals: vec![
                revenue("Start", 2500, 10000, 65),
                revenue("Pro", 5000, 20000, 48),
                revenue("Elite", 7500, 30000, 72),
            ],
            weekly_call_data: vec![
                week("Semana 1", 45),
                week("Semana 2", 32),
                week("Semana 3", 38),
                week("Semana 4", 35),
            ],
            meetings_sales_data: vec![
                month("Jan", 20, 8),
                month("Fev", 25, 10),
                month("Mar", 30, 12),
                month("Abr", 28, 12),
            ],
            funnel_data: vec![
                funnel("Leads", 85),
                funnel("Contatos", 65),
                funnel("Reuniões", 32),
                funnel("Propostas", 22),
                funnel("Vendas", 12),
            ],
            lead_source_data: vec![
                source("Instagram", 45),
                source("Facebook", 25),
                source("Indicação", 15),
                source("Google", 10),
                source("Outros", 5),
            ],
            qualified_leads: vec![
                Lead {
                    id: "1".to_string(),
                    name: "Maria Santos".to_string(),
                    company: "Café Aroma".to_string(),
                    instagram: "@cafearoma".to_string(),
                    phone: "(11)98765-4321".to_string(),
                    source: "Instagram".to_string(),
                    status: "Ativo".to_string(),
                    last_contact: "15/04/25".to_string(),
                    responsible: "Danilo".to_string(),
                },
                Lead {
                    id: "2".to_string(),
                    name: "João Silva".to_string(),
                    company: "Tech Solutions".to_string(),
                    instagram: "@techsolutions".to_string(),
                    phone: "(21)97654-3210".to_string(),
                    source: "Facebook".to_string(),
                    status: "Ativo".to_string(),
                    last_contact: "14/04/25".to_string(),
                    responsible: "Danilo".to_string(),
                },
                Lead {
                    id: "3".to_string(),
                    name: "Ana Oliveira".to_string(),
                    company: "Boutique Charme".to_string(),
                    instagram: "@boutiquecharme".to_string(),
                    phone: "(31)96543-2109".to_string(),
                    source: "Indicação".to_string(),
                    status: "Ativo".to_string(),
                    last_contact: "13/04/25".to_string(),
                    responsible: "Danilo".to_string(),
                },
            ],
            meeting_summaries: vec![
                summary(1, 8, 7, 88),
                summary(2, 10, 6, 60),
                summary(3, 7, 6, 86),
                summary(4, 9, 8, 89),
            ],
            strategic_notes: "Semana 2 teve menor comparecimento, revisar abordagem e horário \
                das reuniões. Leads do Instagram estão mostrando melhor taxa de conversão."
                .to_string(),
            remarketing_leads: vec![
                RemarketingLead {
                    name: "Roberto Mendes".to_string(),
                    source: "Instagram".to_string(),
                    loss_reason: "Sem resposta".to_string(),
                    next_action: "Enviar mensagem".to_string(),
                    next_contact_date: "25/04/25".to_string(),
                },
                RemarketingLead {
                    name: "Carla Duarte".to_string(),
                    source: "Facebook".to_string(),
                    loss_reason: "Orçamento alto".to_string(),
                    next_action: "Oferecer desconto".to_string(),
                    next_contact_date: "28/04/25".to_string(),
                },
            ],
        }
    }
}
