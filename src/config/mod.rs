use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum FontSizePreset {
    Small,
    #[default]
    Standard,
    Large,
}

impl FontSizePreset {
    pub fn offset(&self) -> f32 {
        match self {
            FontSizePreset::Small => -2.0,
            FontSizePreset::Standard => 0.0,
            FontSizePreset::Large => 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum ChatDensity {
    Compact,
    #[default]
    Normal,
    Comfortable,
}

impl ChatDensity {
    pub fn message_spacing(&self) -> f32 {
        match self {
            ChatDensity::Compact => 4.0,
            ChatDensity::Normal => 8.0,
            ChatDensity::Comfortable => 12.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiPreferences {
    #[serde(default)]
    pub font_size: FontSizePreset,
    #[serde(default = "default_base_font_points")]
    pub base_font_points: f32,
    #[serde(default)]
    pub chat_density: ChatDensity,
}

impl Default for UiPreferences {
    fn default() -> Self {
        Self {
            font_size: FontSizePreset::default(),
            base_font_points: default_base_font_points(),
            chat_density: ChatDensity::default(),
        }
    }
}

fn default_base_font_points() -> f32 {
    14.0
}

impl UiPreferences {
    pub fn body_points(&self) -> f32 {
        self.base_font_points + self.font_size.offset()
    }

    pub fn apply_to_context(&self, ctx: &eframe::egui::Context) {
        use eframe::egui::{FontFamily, FontId, TextStyle};

        let base = self.body_points();

        ctx.style_mut(|style| {
            style.text_styles.insert(
                TextStyle::Heading,
                FontId::new(base + 4.0, FontFamily::Proportional),
            );
            style
                .text_styles
                .insert(TextStyle::Body, FontId::new(base, FontFamily::Proportional));
            style.text_styles.insert(
                TextStyle::Button,
                FontId::new(base, FontFamily::Proportional),
            );
            style.text_styles.insert(
                TextStyle::Small,
                FontId::new(base - 2.0, FontFamily::Proportional),
            );
            style.text_styles.insert(
                TextStyle::Monospace,
                FontId::new(base, FontFamily::Monospace),
            );
        });
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_assistant_id")]
    pub assistant_id: String,
    #[serde(default = "default_thread_page_size")]
    pub thread_page_size: u32,
}

fn default_base_url() -> String {
    "http://127.0.0.1:2024".to_string()
}

fn default_assistant_id() -> String {
    "chatbot".to_string()
}

fn default_thread_page_size() -> u32 {
    100
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            assistant_id: default_assistant_id(),
            thread_page_size: default_thread_page_size(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub ui: UiPreferences,
}

impl AppConfig {
    fn config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "threadchat-egui")
            .map(|dirs| dirs.config_dir().join("config.json"))
    }

    /// Load the saved config, falling back to defaults when it is missing or
    /// unreadable.
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        match std::fs::read_to_string(&path) {
            Ok(contents) => Self::parse(&contents).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), error = %e, "invalid config, using defaults");
                Self::default()
            }),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "could not read config");
                Self::default()
            }
        }
    }

    pub fn parse(contents: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(contents)
    }

    pub fn save(&self) {
        let Some(path) = Self::config_path() else {
            return;
        };
        if let Some(parent) = path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                tracing::warn!(path = %parent.display(), error = %e, "could not create config dir");
                return;
            }
        }
        match serde_json::to_string_pretty(self) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&path, json) {
                    tracing::warn!(path = %path.display(), error = %e, "could not save config");
                }
            }
            Err(e) => tracing::warn!(error = %e, "could not serialize config"),
        }
    }

    /// Apply command line overrides; returns true when anything changed.
    pub fn apply_overrides(&mut self, base_url: Option<String>, assistant_id: Option<String>) -> bool {
        let mut changed = false;
        if let Some(url) = base_url {
            if url != self.server.base_url {
                self.server.base_url = url;
                changed = true;
            }
        }
        if let Some(id) = assistant_id {
            if id != self.server.assistant_id {
                self.server.assistant_id = id;
                changed = true;
            }
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_empty_json_when_parse_then_defaults() {
        // Given
        let contents = "{}";

        // When
        let config = AppConfig::parse(contents).unwrap();

        // Then
        assert_eq!(config.server.base_url, "http://127.0.0.1:2024");
        assert_eq!(config.server.assistant_id, "chatbot");
        assert_eq!(config.server.thread_page_size, 100);
        assert_eq!(config.ui.chat_density, ChatDensity::Normal);
    }

    #[test]
    fn given_partial_server_section_when_parse_then_missing_fields_defaulted() {
        let config =
            AppConfig::parse(r#"{"server":{"base_url":"http://agents:8123"},"ui":{"font_size":"Large"}}"#)
                .unwrap();

        assert_eq!(config.server.base_url, "http://agents:8123");
        assert_eq!(config.server.assistant_id, "chatbot");
        assert_eq!(config.ui.body_points(), 16.0);
    }

    #[test]
    fn given_same_values_when_apply_overrides_then_unchanged() {
        let mut config = AppConfig::default();
        let changed = config.apply_overrides(Some(default_base_url()), None);
        assert!(!changed);
    }

    #[test]
    fn given_new_url_when_apply_overrides_then_changed() {
        let mut config = AppConfig::default();
        let changed = config.apply_overrides(Some("http://remote:2024".into()), Some("agent".into()));
        assert!(changed);
        assert_eq!(config.server.base_url, "http://remote:2024");
        assert_eq!(config.server.assistant_id, "agent");
    }
}
