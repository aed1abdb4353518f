// libs/appointment-cell/src/services/share.rs
use shared_models::scheduling::Appointment;

pub fn confirmation_message(appointment: &Appointment) -> String {
    let mut message = format!(
        "Olá, {}! Seu agendamento de {} com {} está confirmado para {} às {}",
        appointment.client_name,
        appointment.service_name,
        appointment.professional_name,
        appointment.date.format("%d/%m/%Y"),
        appointment.time,
    );

    if let Some(unit) = appointment.health_unit.as_deref().filter(|u| !u.is_empty()) {
        message.push_str(&format!(" em {}", unit));
    }
    if let Some(city) = appointment.destination_city.as_deref().filter(|c| !c.is_empty()) {
        message.push_str(&format!(" ({})", city));
    }
    message.push('.');
    message
}

/// Link that opens a messaging app with the confirmation prefilled.
/// Returns `None` when no base URL is configured.
pub fn share_url(base_url: &str, appointment: &Appointment) -> Option<String> {
    let base = base_url.trim();
    if base.is_empty() {
        return None;
    }

    let text = urlencoding::encode(&confirmation_message(appointment)).into_owned();
    let separator = if base.contains('?') { '&' } else { '?' };
    Some(format!("{}{}text={}", base, separator, text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use shared_models::scheduling::{AppointmentStatus, LocationType};
    use uuid::Uuid;

    fn appointment() -> Appointment {
        Appointment {
            id: Uuid::new_v4(),
            client_id: Uuid::new_v4(),
            client_name: "Maria".to_string(),
            professional_id: Uuid::new_v4(),
            professional_name: "Dra. Ana".to_string(),
            professional_image: None,
            service_name: "Consulta (Cardiologia)".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 6, 11).unwrap(),
            time: "09:30".to_string(),
            price: 0.0,
            status: AppointmentStatus::Upcoming,
            location_type: LocationType::Local,
            health_unit: Some("UBS Centro".to_string()),
            destination_city: None,
            external_professional: None,
            has_companion: false,
            transport_status: None,
            notes: None,
            trip_id: None,
            created_at: None,
        }
    }

    #[test]
    fn message_mentions_slot_and_unit() {
        let message = confirmation_message(&appointment());
        assert_eq!(
            message,
            "Olá, Maria! Seu agendamento de Consulta (Cardiologia) com Dra. Ana está confirmado para 11/06/2024 às 09:30 em UBS Centro."
        );
    }

    #[test]
    fn url_is_percent_encoded() {
        let url = share_url("https://wa.me/", &appointment()).unwrap();
        assert!(url.starts_with("https://wa.me/?text=Ol%C3%A1%2C%20Maria"));
        assert!(!url.contains(' '));
    }

    #[test]
    fn blank_base_disables_sharing() {
        assert_eq!(share_url("  ", &appointment()), None);
    }
}
