mod bindings;
mod cli;
mod pages;
mod paths;
mod run;
mod site;
mod snapshot;

use anyhow::Result;
use cli::{Command, ConfigAction, PageArgs, SnapshotArgs};
use paths::AppPaths;
use siteconfig::DisplayMode;
use site::{load_site, ConfigSource};

fn main() -> Result<()> {
    let cli = cli::parse();
    run::initialise_tracing();

    match cli.command {
        Some(Command::Run(args)) => run::run(args),
        Some(Command::Snapshot(args)) => handle_snapshot(args),
        Some(Command::Page(args)) => handle_page(args),
        Some(Command::Config(config_cmd)) => handle_config_command(config_cmd.action),
        None => run::run(cli.run),
    }
}

fn handle_snapshot(args: SnapshotArgs) -> Result<()> {
    let paths = AppPaths::discover()?;
    let site = load_site(args.config.as_deref(), &paths)?;
    let params = bindings::chrome_params(&site.config.background);
    let image = snapshot::render_frame(params, args.size, args.time, args.pointer);
    snapshot::export_png(&image, &args.out)?;
    println!("{}", args.out.display());
    Ok(())
}

fn handle_page(args: PageArgs) -> Result<()> {
    let paths = AppPaths::discover()?;
    let site = load_site(args.config.as_deref(), &paths)?;
    let mode = DisplayMode::for_width(args.width);
    let page = pages::PageView::build(&site.config, &args.path, mode, pages::current_year());
    if args.json {
        println!("{}", serde_json::to_string_pretty(&page)?);
    } else {
        print!("{}", page.to_text());
    }
    Ok(())
}

fn handle_config_command(action: ConfigAction) -> Result<()> {
    let paths = AppPaths::discover()?;
    match action {
        ConfigAction::Check(args) => {
            let site = load_site(args.config.as_deref(), &paths)?;
            let config = &site.config;
            println!("Configuration OK: {}", site.source);
            println!(
                "  stories={} nav={} pricing={} coaches={} schedule={} trainings={}",
                config.stories.len(),
                config.nav.len(),
                config.pricing.len(),
                config.coaches.len(),
                config.schedule.len(),
                config.trainings.len()
            );
            Ok(())
        }
        ConfigAction::Show(args) => {
            let site = load_site(args.config.as_deref(), &paths)?;
            print!("{}", site.config.to_toml_string()?);
            Ok(())
        }
        ConfigAction::Where => {
            let site_file = paths.site_file();
            println!("Configuration directories:");
            println!("  config:     {}", paths.config_dir().display());
            println!("  data:       {}", paths.data_dir().display());
            println!("  cache:      {}", paths.cache_dir().display());
            let status = if site_file.is_file() {
                ConfigSource::File(site_file.clone()).to_string()
            } else {
                format!("{} (missing, using bundled content)", site_file.display())
            };
            println!("  site file:  {status}");
            Ok(())
        }
    }
}
