use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use slideframe_common::{
    error::ConfigError, CommandBuilder, CommandPowerToggle, OnWindow, Orientation, PowerSchedule,
    Result, SlideframeError, Weekday, WeeklySchedule,
};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default = "default_playlists_dir")]
    pub playlists_dir: PathBuf,
    #[serde(default)]
    pub initial_playlist: Option<String>,
    #[serde(default = "default_cycle_interval", with = "humantime_serde")]
    pub cycle_interval: Duration,
    #[serde(default = "default_rotation_interval", with = "humantime_serde")]
    pub rotation_interval: Duration,
    #[serde(default)]
    pub orientation: Orientation,
    #[serde(default)]
    pub power: PowerConfig,
    #[serde(default)]
    pub renderer: RendererConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PowerConfig {
    #[serde(default = "default_power_enabled")]
    pub enabled: bool,
    #[serde(default = "default_retry_interval", with = "humantime_serde")]
    pub retry_interval: Duration,
    #[serde(default)]
    pub use_override: bool,
    #[serde(default = "default_override_window")]
    pub override_window: OnWindow,
    #[serde(default = "default_on_command")]
    pub on_command: Vec<String>,
    #[serde(default = "default_off_command")]
    pub off_command: Vec<String>,
    #[serde(default)]
    pub weekly: WeeklyConfig,
}

/// Per-day windows; a missing day keeps its built-in window.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct WeeklyConfig {
    pub monday: Option<OnWindow>,
    pub tuesday: Option<OnWindow>,
    pub wednesday: Option<OnWindow>,
    pub thursday: Option<OnWindow>,
    pub friday: Option<OnWindow>,
    pub saturday: Option<OnWindow>,
    pub sunday: Option<OnWindow>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RendererConfig {
    #[serde(default = "default_renderer_command")]
    pub command: Vec<String>,
}

fn default_playlists_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join("playlists"))
        .unwrap_or_else(|| PathBuf::from("playlists"))
}

fn default_cycle_interval() -> Duration {
    Duration::from_secs(5 * 60)
}

fn default_rotation_interval() -> Duration {
    Duration::from_secs(24 * 60 * 60)
}

fn default_power_enabled() -> bool {
    cfg!(unix)
}

fn default_retry_interval() -> Duration {
    Duration::from_secs(15 * 60)
}

fn default_override_window() -> OnWindow {
    OnWindow::new(12, 22)
}

fn default_on_command() -> Vec<String> {
    to_args(&["xrandr", "--output", "HDMI-1", "--auto"])
}

fn default_off_command() -> Vec<String> {
    to_args(&["xrandr", "--output", "HDMI-1", "--off"])
}

fn default_renderer_command() -> Vec<String> {
    to_args(&["feh", "--bg-max", "{image}"])
}

fn to_args(args: &[&str]) -> Vec<String> {
    args.iter().map(|s| s.to_string()).collect()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            playlists_dir: default_playlists_dir(),
            initial_playlist: None,
            cycle_interval: default_cycle_interval(),
            rotation_interval: default_rotation_interval(),
            orientation: Orientation::default(),
            power: PowerConfig::default(),
            renderer: RendererConfig::default(),
        }
    }
}

impl Default for PowerConfig {
    fn default() -> Self {
        Self {
            enabled: default_power_enabled(),
            retry_interval: default_retry_interval(),
            use_override: false,
            override_window: default_override_window(),
            on_command: default_on_command(),
            off_command: default_off_command(),
            weekly: WeeklyConfig::default(),
        }
    }
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            command: default_renderer_command(),
        }
    }
}

impl Config {
    /// Loads `$XDG_CONFIG_HOME/slideframe/config.toml`, falling back to the
    /// built-in defaults when the file does not exist.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            log::info!("No configuration file at {:?}, using defaults", config_path);
            let config = Config::default();
            config.validate()?;
            return Ok(config);
        }

        Self::load_from_path(&config_path)
    }

    /// Loads an explicitly given file. A missing file is an error.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SlideframeError::Config(ConfigError::FileRead {
                path: path.to_path_buf(),
                source: e,
            }))?;

        log::debug!("Loaded configuration from {:?}", path);

        let config: Config = toml::from_str(&content)
            .map_err(|e| SlideframeError::Config(ConfigError::TomlParse {
                message: e.to_string(),
            }))?;

        config.validate()?;
        Ok(config)
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or(SlideframeError::Config(ConfigError::NoConfigDir))?
            .join("slideframe");

        Ok(config_dir.join("config.toml"))
    }

    pub fn validate(&self) -> Result<()> {
        validate_interval("cycle_interval", self.cycle_interval)?;
        validate_interval("rotation_interval", self.rotation_interval)?;

        if let Some(name) = &self.initial_playlist {
            if name.trim().is_empty() {
                return Err(SlideframeError::Config(ConfigError::InvalidValue {
                    field: "initial_playlist".to_string(),
                    value: format!("{:?}", name),
                }));
            }
        }

        self.power.validate()?;
        self.renderer.validate()?;

        Ok(())
    }

    pub fn renderer_command(&self) -> Result<CommandBuilder> {
        command_builder("renderer.command", &self.renderer.command)
    }
}

impl PowerConfig {
    fn validate(&self) -> Result<()> {
        validate_interval("power.retry_interval", self.retry_interval)?;
        validate_window("power.override_window", self.override_window)?;

        let days = [
            ("monday", self.weekly.monday),
            ("tuesday", self.weekly.tuesday),
            ("wednesday", self.weekly.wednesday),
            ("thursday", self.weekly.thursday),
            ("friday", self.weekly.friday),
            ("saturday", self.weekly.saturday),
            ("sunday", self.weekly.sunday),
        ];
        for (day, window) in days {
            if let Some(window) = window {
                validate_window(&format!("power.weekly.{}", day), window)?;
            }
        }

        validate_command("power.on_command", &self.on_command)?;
        validate_command("power.off_command", &self.off_command)?;

        Ok(())
    }

    pub fn schedule(&self) -> PowerSchedule {
        PowerSchedule::new(self.weekly.to_schedule(), self.override_window, self.use_override)
    }

    pub fn power_toggle(&self) -> Result<CommandPowerToggle> {
        Ok(CommandPowerToggle::new(
            command_builder("power.on_command", &self.on_command)?,
            command_builder("power.off_command", &self.off_command)?,
        ))
    }
}

impl WeeklyConfig {
    pub fn to_schedule(&self) -> WeeklySchedule {
        let defaults = WeeklySchedule::default();
        let pick = |window: Option<OnWindow>, day| window.unwrap_or_else(|| defaults.window_for(day));

        WeeklySchedule::new([
            pick(self.monday, Weekday::Mon),
            pick(self.tuesday, Weekday::Tue),
            pick(self.wednesday, Weekday::Wed),
            pick(self.thursday, Weekday::Thu),
            pick(self.friday, Weekday::Fri),
            pick(self.saturday, Weekday::Sat),
            pick(self.sunday, Weekday::Sun),
        ])
    }
}

impl RendererConfig {
    fn validate(&self) -> Result<()> {
        validate_command("renderer.command", &self.command)?;

        if !self.command.iter().any(|arg| arg.contains("{image}")) {
            return Err(SlideframeError::Config(ConfigError::Validation {
                message: "renderer.command must contain the {image} placeholder".to_string(),
            }));
        }

        Ok(())
    }
}

fn validate_interval(field: &str, interval: Duration) -> Result<()> {
    if interval < Duration::from_secs(1) {
        return Err(SlideframeError::Config(ConfigError::InvalidValue {
            field: field.to_string(),
            value: format!("{:?}", interval),
        }));
    }
    Ok(())
}

fn validate_window(field: &str, window: OnWindow) -> Result<()> {
    if window.on > window.off || window.off > 24 {
        return Err(SlideframeError::Config(ConfigError::InvalidValue {
            field: field.to_string(),
            value: format!("on = {}, off = {}", window.on, window.off),
        }));
    }
    Ok(())
}

fn validate_command(field: &str, command: &[String]) -> Result<()> {
    match command.first() {
        Some(program) if !program.trim().is_empty() => Ok(()),
        _ => Err(SlideframeError::Config(ConfigError::Validation {
            message: format!("{} must name a program", field),
        })),
    }
}

fn command_builder(field: &str, command: &[String]) -> Result<CommandBuilder> {
    CommandBuilder::new(command.to_vec()).map_err(|e| {
        SlideframeError::Config(ConfigError::Validation {
            message: format!("{}: {}", field, e),
        })
    })
}
