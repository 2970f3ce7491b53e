#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use multifire::{memory::InMemoryBackend, prelude::*};

pub fn options(project_id: &str) -> FirebaseOptions {
    FirebaseOptions {
        api_key: format!("{project_id}-key"),
        auth_domain: format!("{project_id}.firebaseapp.com"),
        project_id: project_id.to_string(),
        storage_bucket: format!("{project_id}.appspot.com"),
        messaging_sender_id: "1234".to_string(),
        app_id: format!("1:1234:web:{project_id}"),
        database_url: None,
        measurement_id: None,
    }
}

pub fn config(name: &str) -> ProjectConfig {
    ProjectConfig::new(name, options(&format!("{name}-id")))
}

/// A backend plus a context with `names` already registered.
pub async fn setup(names: &[&str]) -> (InMemoryBackend, Firebase) {
    let backend = InMemoryBackend::new();
    let firebase = Firebase::new(backend.clone());

    firebase
        .projects()
        .initialize_projects(names.iter().map(|name| config(name)).collect())
        .await
        .unwrap();

    (backend, firebase)
}

/// Collects deliveries of a listener.
pub fn recorder<T: Send + 'static>() -> (Arc<Mutex<Vec<T>>>, Observer<T>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();

    (seen, Observer::new(move |value| sink.lock().unwrap().push(value)))
}
