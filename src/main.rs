use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::{error, info};
use vibe_render::{
    machine::{MachineDescription, MachineError},
    snapshot,
};
use vibe_render_core::{Buffer, Manager, Rect};

#[derive(Parser)]
#[command(about = "Resolve a machine's render graph and render frames headlessly")]
struct Args {
    /// Path to the machine description (TOML)
    machine: PathBuf,

    /// Frame width in pixels
    #[arg(long, default_value_t = 256)]
    width: u32,

    /// Frame height in pixels
    #[arg(long, default_value_t = 224)]
    height: u32,

    /// Number of frames to render
    #[arg(long, default_value_t = 1)]
    frames: u32,

    /// Clip rectangle as X,Y,W,H (defaults to the whole frame)
    #[arg(long, value_parser = parse_clip)]
    clip: Option<Rect>,

    /// Buffer to dump, as tag:renderer.port (outputs take precedence over inputs)
    #[arg(long)]
    dump: Option<String>,

    /// Write the dumped buffer to this PNG file
    #[arg(long, requires = "dump")]
    png: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

fn parse_clip(s: &str) -> Result<Rect, String> {
    let parts = s
        .split(',')
        .map(|p| p.trim().parse::<u32>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("invalid clip '{s}': {e}"))?;
    match parts[..] {
        [x, y, w, h] => Ok(Rect::new(x, y, w, h)),
        _ => Err(format!("invalid clip '{s}': expected X,Y,W,H")),
    }
}

fn dumped_buffer<'m>(manager: &'m Manager, path: &str) -> Result<&'m Buffer, MachineError> {
    let buffer = match manager.find_output(path) {
        Ok(output) => manager.output_buffer(output),
        Err(_) => manager.input_buffer(manager.find_input(path)?),
    };
    buffer.ok_or_else(|| MachineError::NotScheduled(path.to_owned()))
}

fn run(args: &Args) -> Result<(), MachineError> {
    let desc = MachineDescription::load_from_file(&args.machine)?;
    let mut manager = Manager::new();
    desc.build(&mut manager)?;
    manager.resolve()?;

    for &id in manager.execution_order().unwrap_or_default() {
        println!("{}", manager.describe_renderer(id));
    }

    let clip = args
        .clip
        .unwrap_or_else(|| Rect::full(args.width, args.height));
    for _ in 0..args.frames {
        manager.do_render(args.width, args.height, clip)?;
    }
    info!(
        "Rendered {} frame(s) at {}x{}",
        args.frames, args.width, args.height
    );

    if let Some(path) = &args.dump {
        let buffer = dumped_buffer(&manager, path)?;
        match &args.png {
            Some(png) => {
                snapshot::write_png(png, buffer)?;
                println!("Wrote {} ({}x{})", png.display(), buffer.width(), buffer.height());
            }
            None => println!(
                "{path}: {} buffer, {}x{}",
                buffer.kind(),
                buffer.width(),
                buffer.height()
            ),
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    let default_filter = if args.debug { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            eprintln!("vibe-render: {e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clip_parses_four_fields() {
        assert_eq!(parse_clip("8, 16,32,4"), Ok(Rect::new(8, 16, 32, 4)));
        assert!(parse_clip("1,2,3").is_err());
        assert!(parse_clip("a,b,c,d").is_err());
    }

    #[test]
    fn args_accept_dump_with_png() {
        let args = Args::try_parse_from([
            "vibe-render",
            "machine.toml",
            "--dump",
            "screen:out.rgb",
            "--png",
            "out.png",
            "--clip",
            "0,0,10,10",
        ])
        .unwrap();
        assert_eq!(args.clip, Some(Rect::new(0, 0, 10, 10)));
        assert!(Args::try_parse_from(["vibe-render", "m.toml", "--png", "x.png"]).is_err());
    }
}
