use anchor_i18n::config::Config;
use anchor_i18n::extract::{Extractor, HttpFetcher, JsonContentSource, PageFetcher};
use anchor_i18n::mt::{
    DeepLProvider, LanguageKind, MachineTranslator, MockMode, MockTranslator, translate_missing,
};
use anchor_i18n::pipeline::Localizer;
use anchor_i18n::shortcode::Shortcodes;
use anchor_i18n::store::{MemoryStore, TranslationStore};
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::info;

fn cli() -> Command {
    let store_arg = Arg::new("store")
        .long("store")
        .short('s')
        .help("Fragment store file")
        .default_value("anchor-fragments.json");

    Command::new("anchor-i18n")
        .version(env!("CARGO_PKG_VERSION"))
        .about("HTML-safe site localization")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .global(true)
                .help("JSON configuration file"),
        )
        .subcommand(
            Command::new("extract")
                .about("Capture fragments from a content export")
                .arg(
                    Arg::new("content")
                        .help("Content export (JSON)")
                        .required(true)
                        .index(1),
                )
                .arg(store_arg.clone())
                .arg(
                    Arg::new("fetch")
                        .long("fetch")
                        .help("Also fetch rendered product pages")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("translate")
                .about("Machine-translate fragments missing a translation")
                .arg(
                    Arg::new("target-locale")
                        .help("Target language code (e.g., fr, de, pt-BR)")
                        .required(true)
                        .index(1),
                )
                .arg(store_arg.clone())
                .arg(
                    Arg::new("mock")
                        .long("mock")
                        .short('m')
                        .help("Use mock translator instead of DeepL")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("overwrite")
                        .long("overwrite")
                        .help("Replace existing translations")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("localize")
                .about("Localize an HTML document and print it")
                .arg(
                    Arg::new("target-locale")
                        .help("Target language code")
                        .required(true)
                        .index(1),
                )
                .arg(
                    Arg::new("input")
                        .help("HTML file, or - for stdin")
                        .default_value("-")
                        .index(2),
                )
                .arg(store_arg.clone())
                .arg(
                    Arg::new("verbose")
                        .long("verbose")
                        .short('v')
                        .help("Report what was replaced on stderr")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("languages")
                .about("List the languages DeepL supports")
                .arg(
                    Arg::new("source")
                        .long("source")
                        .help("List source instead of target languages")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("no-parentheses")
                        .long("no-parentheses")
                        .help("Strip qualifiers such as \"(British)\"")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("codes")
                        .long("codes")
                        .help("Print code and name pairs")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("clear")
                .about("Delete every fragment and translation")
                .arg(store_arg),
        )
}

fn load_config(matches: &ArgMatches) -> anchor_i18n::Result<Config> {
    match matches.get_one::<String>("config") {
        Some(path) => Config::from_file(Path::new(path)),
        None => Ok(Config::from_env()),
    }
}

fn store_path(matches: &ArgMatches) -> PathBuf {
    matches
        .get_one::<String>("store")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("anchor-fragments.json"))
}

fn read_input(input: &str) -> std::io::Result<String> {
    if input == "-" {
        let mut buffer = String::new();
        std::io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        std::fs::read_to_string(input)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let matches = cli().get_matches();
    let Some((command, sub)) = matches.subcommand() else {
        unreachable!("subcommand required");
    };
    let config = load_config(sub)?;

    match (command, sub) {
        ("extract", sub) => {
            let content = sub.get_one::<String>("content").ok_or("missing content export")?;
            let path = store_path(sub);
            let source = JsonContentSource::from_file(Path::new(content))?;
            let mut store = MemoryStore::load(&path)?;
            let extractor = Extractor::new(&config.translation.source_locale);

            let fetcher = if sub.get_flag("fetch") {
                Some(HttpFetcher::new()?)
            } else {
                None
            };
            let report = extractor
                .crawl(
                    &source,
                    fetcher.as_ref().map(|f| f as &dyn PageFetcher),
                    &mut store,
                )
                .await;
            store.save(&path)?;
            println!(
                "{} fragments discovered, {} new, {} stored",
                report.discovered,
                report.inserted,
                store.fragment_count()
            );
        }
        ("translate", sub) => {
            let target = sub
                .get_one::<String>("target-locale")
                .ok_or("missing target locale")?;
            let path = store_path(sub);
            let mut store = MemoryStore::load(&path)?;
            let mut settings = config.translation.clone();
            settings.overwrite |= sub.get_flag("overwrite");

            let translator: Box<dyn MachineTranslator> = if sub.get_flag("mock") {
                Box::new(MockTranslator::new(MockMode::Suffix))
            } else {
                if settings.api_key.is_none() {
                    eprintln!("DEEPL_API_KEY environment variable not set");
                    eprintln!("   Set it with: export DEEPL_API_KEY=your_api_key");
                    eprintln!("   Or use --mock to use mock translator");
                    return Err("Missing API key".into());
                }
                Box::new(DeepLProvider::from_config(&settings)?)
            };
            info!(provider = translator.provider_name(), target = target.as_str(), "translating");

            let report = translate_missing(
                &mut store,
                translator.as_ref(),
                target,
                &settings,
                &Shortcodes::default(),
            )
            .await?;
            store.save(&path)?;
            println!(
                "{} translated, {} rejected, {} already translated",
                report.translated, report.rejected, report.skipped_existing
            );
        }
        ("localize", sub) => {
            let target = sub
                .get_one::<String>("target-locale")
                .ok_or("missing target locale")?;
            let input = sub.get_one::<String>("input").ok_or("missing input")?;
            let store = MemoryStore::load(&store_path(sub))?;
            let document = read_input(input)?;

            let localizer = Localizer::new(config.localizer.clone());
            let localized = localizer.localize_from_store(&document, target, &store);
            if sub.get_flag("verbose") {
                eprintln!("{:?}", localized.report);
            }
            print!("{}", localized.html);
        }
        ("languages", sub) => {
            let provider = DeepLProvider::from_config(&config.translation)?;
            if sub.get_flag("codes") {
                for (code, name) in provider.language_codes().await? {
                    println!("{}\t{}", code, name);
                }
            } else {
                let kind = if sub.get_flag("source") {
                    LanguageKind::Source
                } else {
                    LanguageKind::Target
                };
                for name in provider
                    .language_names(kind, sub.get_flag("no-parentheses"))
                    .await?
                {
                    println!("{}", name);
                }
            }
        }
        ("clear", sub) => {
            let path = store_path(sub);
            let mut store = MemoryStore::load(&path)?;
            let fragments = store.fragment_count();
            store.clear();
            store.save(&path)?;
            println!("{} fragments removed", fragments);
        }
        (other, _) => unreachable!("unknown subcommand {}", other),
    }

    Ok(())
}
