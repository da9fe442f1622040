use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Health {
    pub status: &'static str,
}
