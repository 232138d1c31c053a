use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use excision_core::{
    compute_defect_size, parse_mm, resolve_excision_code, ClinicConfig, EditingSession, Folder,
    HistologyClass, ProcedureRecord, RegionClass, Transition,
};
use excision_store::ProcedureStore;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "excise")]
#[command(about = "Skin lesion excision records, audit lines and billing")]
struct Cli {
    /// Procedure data directory (overrides EXCISE_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List procedures in a folder, newest first
    List {
        /// Unprocessed, Billed or Archived
        #[arg(long, default_value = "Unprocessed")]
        folder: Folder,
        /// Print the records as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the operative note for a procedure
    Note {
        procedure_id: i64,
        /// Prefix the note with the audit line
        #[arg(long)]
        with_audit: bool,
    },
    /// Print the audit line for a procedure
    Audit { procedure_id: i64 },
    /// Suggest an excision code for a defect
    Suggest {
        /// BCC/SCC, Melanoma, Non-Malignant or Biopsy
        #[arg(long)]
        histology: HistologyClass,
        /// Region code (e.g. nose) or region class (Option1..Option3)
        #[arg(long)]
        region: Option<String>,
        /// Defect size in mm
        #[arg(long)]
        size: String,
    },
    /// Import a procedure record from a JSON file into Unprocessed
    Import { file: PathBuf },
    /// Finalise billing for an unprocessed procedure
    Bill {
        procedure_id: i64,
        /// Histology per lesion as LESION=CLASS, e.g. 1=BCC/SCC (repeatable)
        #[arg(long = "histology", value_parser = parse_lesion_histology)]
        histology: Vec<(u32, HistologyClass)>,
        /// Consultation item number
        #[arg(long)]
        consult: Option<String>,
        /// Billing comment
        #[arg(long)]
        comment: Option<String>,
    },
    /// Archive a billed procedure
    Archive {
        procedure_id: i64,
        #[arg(long)]
        comment: Option<String>,
    },
    /// Delete an unprocessed procedure (kept as a tombstone in Archived)
    Delete {
        procedure_id: i64,
        /// Reason for deletion
        #[arg(long)]
        comment: String,
    },
}

fn parse_lesion_histology(raw: &str) -> Result<(u32, HistologyClass), String> {
    let (lesion, class) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected LESION=CLASS, got '{raw}'"))?;
    let lesion: u32 = lesion
        .trim()
        .parse()
        .map_err(|_| format!("invalid lesion number '{lesion}'"))?;
    let class = class.parse::<HistologyClass>().map_err(|e| e.to_string())?;
    Ok((lesion, class))
}

/// Resolves configuration from `EXCISE_*` environment variables.
///
/// # Environment Variables
/// - `EXCISE_DATA_DIR`: procedure data directory (default: "procedure_data")
/// - `EXCISE_CODE_TABLE`: billing code table override (YAML or JSON)
/// - `EXCISE_REGION_TABLE`: region table override
/// - `EXCISE_PATHOLOGY_TABLE`: pathology label table override
fn load_config(data_dir: Option<PathBuf>) -> anyhow::Result<ClinicConfig> {
    let env_path = |name: &str| std::env::var_os(name).map(PathBuf::from);

    ClinicConfig::resolve(
        data_dir.or_else(|| env_path("EXCISE_DATA_DIR")),
        env_path("EXCISE_CODE_TABLE"),
        env_path("EXCISE_REGION_TABLE"),
        env_path("EXCISE_PATHOLOGY_TABLE"),
    )
    .context("failed to load clinic configuration")
}

/// `RUST_LOG` plus defaults: lifecycle commands and store moves at info, dropped configuration
/// entries at warn.
fn log_filter() -> anyhow::Result<EnvFilter> {
    Ok(EnvFilter::from_default_env()
        .add_directive("excise=info".parse()?)
        .add_directive("excision_store=info".parse()?)
        .add_directive("excision_core=warn".parse()?))
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(log_filter()?)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("Use 'excise --help' for commands");
        return Ok(());
    };

    let config = Arc::new(load_config(cli.data_dir)?);
    let store = ProcedureStore::open(config.data_dir())
        .with_context(|| format!("failed to open {}", config.data_dir().display()))?;

    match command {
        Commands::List { folder, json } => {
            let records = store.list(folder)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else if records.is_empty() {
                println!("No procedures in {folder}.");
            } else {
                for record in records {
                    println!(
                        "ID: {}, Date: {}, Patient: {}, Doctor: {}, Lesions: {}, Status: {}",
                        record.procedure_id,
                        record.procedure_date.format("%Y-%m-%d %H:%M"),
                        record.patient_name,
                        record.doctor_code,
                        record.lesions.len(),
                        record.status
                    );
                }
            }
        }
        Commands::Note {
            procedure_id,
            with_audit,
        } => {
            let (_, record) = store.find(procedure_id)?;
            let session = EditingSession::open(config, record);
            if with_audit {
                println!("{}", session.combined_output());
            } else {
                println!("{}", session.operative_note());
            }
        }
        Commands::Audit { procedure_id } => {
            let (_, record) = store.find(procedure_id)?;
            let session = EditingSession::open(config, record);
            println!("{}", session.audit_line());
        }
        Commands::Suggest {
            histology,
            region,
            size,
        } => {
            let region_class = match region.as_deref() {
                Some(region) => Some(
                    config
                        .regions()
                        .class(region)
                        .map(Ok)
                        .unwrap_or_else(|| region.parse::<RegionClass>())?,
                ),
                None => None,
            };
            let defect_size = parse_mm(&size);

            match resolve_excision_code(config.code_table(), histology, region_class, defect_size) {
                Some(entry) => println!("{} {}", entry.item, entry.desc),
                None => println!("No automatic suggestion."),
            }
        }
        Commands::Import { file } => {
            let contents = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let record = ProcedureRecord::from_json(&contents)
                .with_context(|| format!("failed to parse {}", file.display()))?;
            if store.find(record.procedure_id).is_ok() {
                bail!("procedure {} already exists", record.procedure_id);
            }

            let record = EditingSession::open(config, record).into_record();
            let path = store.save_new(&record)?;
            tracing::info!(
                "imported procedure {} from {}",
                record.procedure_id,
                file.display()
            );
            println!(
                "Imported procedure {} with {} lesion(s) to {}",
                record.procedure_id,
                record.lesions.len(),
                path.display()
            );
        }
        Commands::Bill {
            procedure_id,
            histology,
            consult,
            comment,
        } => {
            let record = store.load(Folder::Unprocessed, procedure_id)?;
            let mut session = EditingSession::open(config, record);
            for (lesion, class) in histology {
                session.select_histology(lesion, class)?;
                tracing::info!("procedure {procedure_id}: lesion {lesion} classified as {class}");
            }
            if let Some(consult) = consult {
                session.set_consult_item(consult);
            }
            session.finalise_billing(comment.as_deref())?;

            let record = session.into_record();
            store.commit(Folder::Unprocessed, &record)?;
            for lesion in &record.lesions {
                println!(
                    "Lesion {}: {} (defect {}mm)",
                    lesion.id,
                    if lesion.procedure_item_number.is_empty() {
                        "-"
                    } else {
                        lesion.procedure_item_number.as_str()
                    },
                    compute_defect_size(lesion)
                );
            }
            println!("Billed procedure {procedure_id}");
        }
        Commands::Archive {
            procedure_id,
            comment,
        } => {
            store.transition(
                Folder::Billed,
                procedure_id,
                Transition::Archive,
                comment.as_deref(),
            )?;
            tracing::info!("archived procedure {procedure_id}");
            println!("Archived procedure {procedure_id}");
        }
        Commands::Delete {
            procedure_id,
            comment,
        } => {
            store.transition(
                Folder::Unprocessed,
                procedure_id,
                Transition::Delete,
                Some(&comment),
            )?;
            tracing::info!("deleted procedure {procedure_id}: {comment}");
            println!("Deleted procedure {procedure_id}");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_lesion_histology() {
        assert_eq!(
            parse_lesion_histology("2=bcc/scc"),
            Ok((2, HistologyClass::BccScc))
        );
        assert_eq!(
            parse_lesion_histology("1= Non-Malignant"),
            Ok((1, HistologyClass::NonMalignant))
        );
        assert!(parse_lesion_histology("BCC/SCC").is_err());
        assert!(parse_lesion_histology("x=Melanoma").is_err());
        assert!(parse_lesion_histology("1=Keloid").is_err());
    }

    #[test]
    fn test_cli_parses_bill() {
        let cli = Cli::try_parse_from([
            "excise",
            "bill",
            "1714658400000",
            "--histology",
            "1=Melanoma",
            "--histology",
            "2=Biopsy",
            "--consult",
            "23",
        ])
        .expect("parses");
        match cli.command {
            Some(Commands::Bill {
                procedure_id,
                histology,
                consult,
                comment,
            }) => {
                assert_eq!(procedure_id, 1714658400000);
                assert_eq!(
                    histology,
                    vec![(1, HistologyClass::Melanoma), (2, HistologyClass::Biopsy)]
                );
                assert_eq!(consult.as_deref(), Some("23"));
                assert!(comment.is_none());
            }
            _ => panic!("expected bill command"),
        }
    }

    #[test]
    fn test_cli_parses_list_folder() {
        let cli = Cli::try_parse_from(["excise", "list", "--folder", "billed"]).expect("parses");
        assert!(matches!(
            cli.command,
            Some(Commands::List {
                folder: Folder::Billed,
                json: false
            })
        ));
    }

    #[test]
    fn test_log_filter_shows_core_warnings() {
        let filter = log_filter().expect("directives parse").to_string();
        assert!(filter.contains("excision_core=warn"));
        assert!(filter.contains("excise=info"));
    }

    #[test]
    fn test_delete_requires_comment() {
        assert!(Cli::try_parse_from(["excise", "delete", "1"]).is_err());
    }
}
