use nwkrust_types::IntegrationKind;

use super::Integration;

/// A recallable preset
///
/// The integration id doubles as the scene number recalled through the
/// owning area, device or keypad button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scene {
    id: u32,
    name: String,
}

impl Scene {
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

impl Integration for Scene {
    fn integration_id(&self) -> u32 {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> IntegrationKind {
        IntegrationKind::Scene
    }
}
