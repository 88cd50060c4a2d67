//! Output settings.

use anstyle::{AnsiColor, Style};
use std::io::IsTerminal;

/// When to emit ANSI styling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ColorMode {
    /// Style only when stdout is a terminal and `NO_COLOR` is unset.
    #[default]
    Auto,
    Always,
    Never,
}

impl ColorMode {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "auto" => Some(Self::Auto),
            "always" | "on" | "1" | "true" => Some(Self::Always),
            "never" | "off" | "0" | "false" => Some(Self::Never),
            _ => None,
        }
    }
}

/// How `Json<T>` results are rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum JsonStyle {
    #[default]
    Pretty,
    Compact,
}

impl JsonStyle {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pretty" => Some(Self::Pretty),
            "compact" => Some(Self::Compact),
            _ => None,
        }
    }
}

/// Router output settings.
///
/// # Example
///
/// ```
/// use ruta::{ColorMode, JsonStyle, Settings};
///
/// let settings = Settings {
///     color: ColorMode::Never,
///     json: JsonStyle::Compact,
/// };
/// assert!(!settings.color_enabled());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Settings {
    pub color: ColorMode,
    pub json: JsonStyle,
}

impl Settings {
    /// Read settings from the environment.
    ///
    /// - `NO_COLOR` (non-empty, not `0`/`false`) forces [`ColorMode::Never`]
    /// - `RUTA_COLOR=auto|always|never`
    /// - `RUTA_JSON=pretty|compact`
    ///
    /// Unrecognized values fall back to the defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut settings = Self::default();

        if let Some(mode) = lookup("RUTA_COLOR").as_deref().and_then(ColorMode::parse) {
            settings.color = mode;
        }
        if lookup("NO_COLOR").is_some_and(|v| !v.is_empty() && v != "0" && !v.eq_ignore_ascii_case("false")) {
            settings.color = ColorMode::Never;
        }
        if let Some(style) = lookup("RUTA_JSON").as_deref().and_then(JsonStyle::parse) {
            settings.json = style;
        }

        settings
    }

    /// Whether output should carry ANSI styling.
    pub fn color_enabled(&self) -> bool {
        match self.color {
            ColorMode::Always => true,
            ColorMode::Never => false,
            ColorMode::Auto => std::io::stdout().is_terminal(),
        }
    }

    /// Style `headline` as an error when color is enabled.
    pub(crate) fn error_headline(&self, headline: &str) -> String {
        if !self.color_enabled() {
            return headline.to_string();
        }
        let style = Style::new().bold().fg_color(Some(AnsiColor::Red.into()));
        format!("{}{}{}", style.render(), headline, style.render_reset())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::from_lookup(lookup(&[]));
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.color, ColorMode::Auto);
        assert_eq!(settings.json, JsonStyle::Pretty);
    }

    #[test]
    fn test_no_color_wins() {
        let settings = Settings::from_lookup(lookup(&[("RUTA_COLOR", "always"), ("NO_COLOR", "1")]));
        assert_eq!(settings.color, ColorMode::Never);

        let settings = Settings::from_lookup(lookup(&[("RUTA_COLOR", "always"), ("NO_COLOR", "")]));
        assert_eq!(settings.color, ColorMode::Always);
    }

    #[test]
    fn test_json_style_and_garbage() {
        let settings = Settings::from_lookup(lookup(&[("RUTA_JSON", "Compact"), ("RUTA_COLOR", "rainbow")]));
        assert_eq!(settings.json, JsonStyle::Compact);
        assert_eq!(settings.color, ColorMode::Auto);
    }

    #[test]
    fn test_error_headline_styling() {
        let plain = Settings {
            color: ColorMode::Never,
            ..Default::default()
        };
        assert_eq!(plain.error_headline("Error: x"), "Error: x");

        let styled = Settings {
            color: ColorMode::Always,
            ..Default::default()
        };
        let out = styled.error_headline("Error: x");
        assert!(out.starts_with("\x1b["));
        assert!(out.contains("Error: x"));
    }
}
