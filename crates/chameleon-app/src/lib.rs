//! chameleon: a simple color picker for X11.
//!
//! Ties the command line, configuration file, conversion expression and
//! X11 backend together into one selection run.

pub mod cli;
pub mod config;
mod error;

pub use cli::CliArgs;
pub use config::{ConfigError, ConfigFile, Settings};
pub use error::{AppError, AppResult};

use chameleon_core::{CompiledExpression, Rgb, SelectionDriver, Template, parse, parse_hex_list};
use chameleon_x11::X11Source;

/// Everything a run needs, validated before the display is touched.
#[derive(Debug, Clone)]
pub struct Plan {
    pub settings: Settings,
    pub driver: SelectionDriver,
}

impl Plan {
    /// Load the configuration file named on the command line, or the
    /// default one, and build the plan.
    pub fn from_args(args: &CliArgs) -> AppResult<Self> {
        let file = ConfigFile::load(args.config.as_deref())?;
        Self::new(args, file)
    }

    /// Validate template, expression and seed colors.
    pub fn new(args: &CliArgs, file: ConfigFile) -> AppResult<Self> {
        let settings = Settings::resolve(args, file)?;
        log::debug!("Settings: {:?}", settings);

        let template = Template::parse(&settings.format)?;
        let conversion = settings.conversion.as_deref().map(compile).transpose()?;
        let seeds: Vec<Rgb> = parse_hex_list(&args.colors)?;
        if !seeds.is_empty() {
            log::info!("{} seed color(s)", seeds.len());
        }

        let driver = SelectionDriver::new(settings.count, template, conversion, seeds);
        Ok(Self { settings, driver })
    }
}

fn compile(expression: &str) -> AppResult<CompiledExpression> {
    parse(expression).map_err(|error| AppError::Conversion {
        expression: expression.to_string(),
        error,
    })
}

/// Run the picker, printing one line per picked color to stdout.
pub fn run(args: &CliArgs) -> AppResult<()> {
    let plan = Plan::from_args(args)?;
    let mut source = X11Source::connect(None, plan.settings.layout)?;
    let mut out = std::io::stdout().lock();
    let picks = plan.driver.run(&mut source, &mut out)?;
    log::info!("Picked {} color(s)", picks.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(conversion: Option<&str>, format: Option<&str>, colors: &[&str]) -> CliArgs {
        CliArgs {
            conversion: conversion.map(str::to_string),
            format: format.map(str::to_string),
            colors: colors.iter().map(|c| c.to_string()).collect(),
            ..Default::default()
        }
    }

    fn plan(args: &CliArgs) -> AppResult<Plan> {
        Plan::new(args, ConfigFile::default())
    }

    #[test]
    fn test_valid_plan() {
        let plan = plan(&args(Some("hls(h, l1, s)"), None, &["#ff0000 #00ff00"])).unwrap();
        assert_eq!(plan.driver.count(), 1);
        assert_eq!(plan.settings.conversion.as_deref(), Some("hls(h, l1, s)"));
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(matches!(plan(&args(Some("hls(h,"), None, &[])), Err(AppError::Conversion { .. })));
        assert!(matches!(plan(&args(None, Some("{9}"), &[])), Err(AppError::Format(_))));
        assert!(matches!(plan(&args(None, None, &["red"])), Err(AppError::Seed(_))));
    }

    #[test]
    fn test_missing_explicit_config() {
        let args = CliArgs {
            config: Some(std::path::PathBuf::from("/nonexistent/chameleon.json")),
            ..Default::default()
        };
        let err = Plan::from_args(&args).unwrap_err();
        assert!(matches!(err, AppError::Config(ConfigError::Read { .. })));
        assert_eq!(err.exit_code(), 1);
    }
}
