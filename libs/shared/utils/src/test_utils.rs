use std::sync::Arc;
use chrono::{Duration, NaiveDate, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use base64::{Engine as _, engine::general_purpose};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::AppState;
use shared_models::auth::User;

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
        }
    }
}

impl TestConfig {
    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            supabase_jwt_secret: self.jwt_secret.clone(),
            ..AppConfig::default()
        }
    }

    pub fn with_url(url: &str) -> Self {
        Self {
            supabase_url: url.to_string(),
            ..Self::default()
        }
    }

    pub fn to_state(&self) -> Arc<AppState> {
        AppState::shared(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub role: String,
}

impl Default for TestUser {
    fn default() -> Self {
        Self::new("test@example.com", "citizen")
    }
}

impl TestUser {
    pub fn new(email: &str, role: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            role: role.to_string(),
        }
    }

    pub fn citizen(email: &str) -> Self {
        Self::new(email, "citizen")
    }

    pub fn professional(email: &str) -> Self {
        Self::new(email, "professional")
    }

    pub fn attendant(email: &str) -> Self {
        Self::new(email, "attendant")
    }

    pub fn driver(email: &str) -> Self {
        Self::new(email, "driver")
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, "admin")
    }

    pub fn uuid(&self) -> Uuid {
        Uuid::parse_str(&self.id).unwrap_or_default()
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: Some(self.email.clone()),
            role: Some(self.role.clone()),
            metadata: None,
            created_at: Some(Utc::now()),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let payload = json!({
            "sub": user.id,
            "email": user.email,
            "role": "authenticated",
            "user_metadata": { "role": user.role },
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());

        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(signature);

        format!("{}.{}", signing_input, signature_encoded)
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }
}

/// Row builders shaped like the data service's JSON.
pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    pub fn appointment_row(
        id: Uuid,
        client_id: Uuid,
        professional_id: Uuid,
        date: NaiveDate,
        time: &str,
        status: &str,
    ) -> Value {
        json!({
            "id": id,
            "client_id": client_id,
            "client_name": "Maria da Silva",
            "professional_id": professional_id,
            "professional_name": "Dra. Ana Souza",
            "professional_image": null,
            "service_name": "Clínico Geral",
            "date": date,
            "time": time,
            "price": 0.0,
            "status": status,
            "location_type": "local",
            "health_unit": "UBS Centro",
            "destination_city": null,
            "external_professional": null,
            "has_companion": false,
            "transport_status": null,
            "notes": null,
            "trip_id": null,
            "created_at": "2024-06-01T12:00:00Z"
        })
    }

    pub fn external_appointment_row(
        id: Uuid,
        date: NaiveDate,
        has_companion: bool,
        transport_status: &str,
        trip_id: Option<Uuid>,
    ) -> Value {
        json!({
            "id": id,
            "client_id": Uuid::new_v4(),
            "client_name": "João Pereira",
            "professional_id": Uuid::new_v4(),
            "professional_name": "Regulação TFD",
            "service_name": "Cardiologia",
            "date": date,
            "time": "07:15",
            "price": 0.0,
            "status": "upcoming",
            "location_type": "external",
            "health_unit": "Secretaria de Saúde",
            "destination_city": "Campina Grande",
            "external_professional": "Dr. Paulo Lima",
            "has_companion": has_companion,
            "transport_status": transport_status,
            "notes": null,
            "trip_id": trip_id
        })
    }

    pub fn trip_row(id: Uuid, date: NaiveDate, capacity: u32, passengers_count: u32) -> Value {
        json!({
            "id": id,
            "date": date,
            "time": "05:00",
            "destination_id": Uuid::new_v4(),
            "destination_name": "Campina Grande",
            "vehicle_id": Uuid::new_v4(),
            "vehicle_name": "Van 02",
            "driver_id": Uuid::new_v4(),
            "driver_name": "Carlos Motorista",
            "capacity": capacity,
            "passengers_count": passengers_count,
            "status": "scheduled"
        })
    }

    pub fn profile_settings_row(professional_id: Uuid, settings: Value) -> Value {
        json!({
            "id": professional_id,
            "full_name": "Dra. Ana Souza",
            "settings": settings
        })
    }

    pub fn error_response(message: &str, code: &str) -> Value {
        json!({
            "message": message,
            "code": code
        })
    }
}
