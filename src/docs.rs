// src/docs.rs

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::handlers;
use crate::models::contacts::{Contact, ContactStatus, ContactsDocument};
use crate::models::dashboard::{
    DashboardData, FunnelData, Indicator, IndicatorStatus, Lead, LeadSourceData, MeetingSummary,
    MeetingsSalesData, RemarketingLead, RevenueGoal, WeeklyCallData,
};
use crate::models::import::{ColumnMapping, ImportField};
use crate::models::presence::{ChangeRecord, ConnectionState};

// Documentação OpenAPI servida em /api/docs/openapi.json
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Painel Comercial — API",
        description = "Backend do dashboard comercial: documentos sincronizados em tempo real, \
            contatos com importação de planilhas e export em Excel.",
        version = "0.1.0"
    ),
    paths(
        handlers::dashboard::get_dashboard,
        handlers::dashboard::update_dashboard,
        handlers::dashboard::export_dashboard,
        handlers::contacts::list_contacts,
        handlers::contacts::create_contact,
        handlers::contacts::update_contact,
        handlers::contacts::update_status,
        handlers::contacts::delete_contact,
        handlers::contacts::upload_import,
        handlers::contacts::map_import_column,
        handlers::contacts::confirm_import,
        handlers::contacts::cancel_import,
    ),
    components(schemas(
        Contact,
        ContactStatus,
        ContactsDocument,
        DashboardData,
        Indicator,
        IndicatorStatus,
        RevenueGoal,
        WeeklyCallData,
        MeetingsSalesData,
        FunnelData,
        LeadSourceData,
        Lead,
        MeetingSummary,
        RemarketingLead,
        ColumnMapping,
        ImportField,
        ChangeRecord,
        ConnectionState,
        handlers::contacts::ContactPayload,
        handlers::contacts::UpdateStatusPayload,
        handlers::contacts::MapColumnPayload,
        handlers::contacts::ImportSessionResponse,
        handlers::contacts::ImportResultResponse,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "Dashboard", description = "Documento de KPIs e metas"),
        (name = "Contatos", description = "Lista de contatos sincronizada"),
        (name = "Importação", description = "Importação de contatos via planilha")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "api_jwt",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
