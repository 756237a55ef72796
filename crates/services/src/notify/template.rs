use realtydesk_db::models::{ActorRole, SupportCase};

use super::CaseEmail;

pub fn case_opened(case: &SupportCase, property_name: &str) -> CaseEmail {
    let first = case.conversation.first();
    let customer = first.map(|m| m.message_by.display_name.as_str()).unwrap_or("");
    let email = first.map(|m| m.message_by.contact_email.as_str()).unwrap_or("");
    let about = first.and_then(|m| m.inquiry_about.as_deref()).unwrap_or("");
    let details = first.and_then(|m| m.inquiry_details.as_deref()).unwrap_or("");
    let created = case
        .created_at
        .try_to_rfc3339_string()
        .unwrap_or_default();

    let html = format!(
        "<h2>New Support Case</h2>\
         <p><strong>Property:</strong> {property}</p>\
         <p><strong>Opened by:</strong> {opened_by}</p>\
         <p><strong>Customer:</strong> {customer} ({email})</p>\
         <p><strong>Inquiry about:</strong> {about}</p>\
         <p><strong>Details:</strong> {details}</p>\
         <p><strong>Created:</strong> {created}</p>",
        property = escape(property_name),
        opened_by = case.opened_by.as_str(),
        customer = escape(customer),
        email = escape(email),
        about = escape(about),
        details = escape(details),
    );

    CaseEmail {
        subject: format!("New Support Case | {property_name}"),
        html,
    }
}

pub fn case_closed(case: &SupportCase, property_name: &str, closed_by: Option<ActorRole>) -> CaseEmail {
    let html = format!(
        "<h2>Support Case Closed</h2>\
         <p><strong>Property:</strong> {property}</p>\
         <p><strong>Case:</strong> {id}</p>\
         <p><strong>Closed by:</strong> {closed_by}</p>\
         <p><strong>Messages:</strong> {count}</p>",
        property = escape(property_name),
        id = case.id.map(|id| id.to_hex()).unwrap_or_default(),
        closed_by = closed_by.map(|r| r.as_str()).unwrap_or("unknown"),
        count = case.conversation.len(),
    );

    CaseEmail {
        subject: format!("Support Case Closed | {property_name}"),
        html,
    }
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
