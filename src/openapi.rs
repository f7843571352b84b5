use crate::models::{Complaint, ComplaintStatus, ComplaintType, NewComplaint, SubmitterRole, UsState};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::login,
        crate::routes::list_complaints,
        crate::routes::submit_complaint,
        crate::routes::update_status,
    ),
    components(schemas(
        Complaint, NewComplaint, UsState, ComplaintType, SubmitterRole, ComplaintStatus,
        crate::routes::LoginRequest, crate::routes::UpdateStatusRequest
    )),
    tags(
        (name = "complaints", description = "Complaint intake and triage"),
        (name = "auth", description = "Staff shared-secret check"),
    )
)]
pub struct ApiDoc;
