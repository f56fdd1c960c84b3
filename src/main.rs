use std::io::{self, IsTerminal, Read};

use clap::Parser;

use anuvaad::Config;

#[derive(Parser, Debug)]
#[command(
    name = "anuvaad",
    version,
    about = "Translate text, image text, and video speech"
)]
struct Cli {
    /// Target language code (default: hi)
    #[arg(short = 'l', long = "lang", default_value = "hi")]
    lang: String,

    /// Declared source language code (auto-detection is not supported)
    #[arg(short = 'L', long = "source-lang", default_value = "en")]
    source_lang: String,

    /// Extract and translate text from an image file
    #[arg(long = "image", conflicts_with = "video")]
    image: Option<String>,

    /// Transcribe and translate speech from a video file
    #[arg(long = "video")]
    video: Option<String>,

    /// Speak the translated result aloud
    #[arg(long = "speak")]
    speak: bool,

    /// Do not append the result to the local history file
    #[arg(long = "no-history")]
    no_history: bool,

    /// Read extra settings from a local TOML file
    #[arg(short = 'r', long = "read-settings")]
    read_settings: Option<String>,

    /// Verbose progress and diagnostics on stderr
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(err) = anuvaad::logging::init(cli.verbose) {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }

    let input = if cli.image.is_none() && cli.video.is_none() {
        read_stdin()
    } else {
        None
    };

    let config = Config {
        lang: cli.lang,
        source_lang: cli.source_lang,
        image: cli.image,
        video: cli.video,
        speak: cli.speak,
        no_history: cli.no_history,
        settings_path: cli.read_settings,
    };

    match anuvaad::run(config, input).await {
        Ok(output) => println!("{output}"),
        Err(err) => {
            eprintln!("error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn read_stdin() -> Option<String> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return None;
    }
    let mut buffer = String::new();
    stdin.lock().read_to_string(&mut buffer).ok()?;
    Some(buffer)
}
