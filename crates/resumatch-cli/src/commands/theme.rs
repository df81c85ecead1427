use clap::ValueEnum;
use resumatch_core::{Config, Theme};

#[derive(Clone, Copy, ValueEnum)]
pub enum ThemeMode {
    Light,
    Dark,
    /// Switch to the other theme
    Toggle,
}

/// Print the theme preference, or change it when `mode` is given.
pub fn run(mode: Option<ThemeMode>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = Config::load()?;
    let Some(mode) = mode else {
        println!("{}", config.ui.theme);
        return Ok(());
    };

    config.ui.theme = match mode {
        ThemeMode::Light => Theme::Light,
        ThemeMode::Dark => Theme::Dark,
        ThemeMode::Toggle => config.ui.theme.toggled(),
    };
    config.save()?;
    println!("{}", config.ui.theme);
    Ok(())
}
