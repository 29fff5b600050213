//! CLI for docfill - DOCX template filling and rendering

use clap::{Args, Parser, Subcommand};
use docfill::html::compose_preview;
use docfill::template::{
    audit_placeholders, values_from_json, FieldSpec, FieldValues, FsTemplateStore, LineBreaks,
    TemplateStore, TemplateUpdate, Upload, UploadPolicy,
};
use docfill::{
    Error, FieldPolicy, Locale, LoadedTemplate, OutputKind, Pipeline, PipelineOptions, Result,
};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the placeholder names of a DOCX template
    Fields {
        /// Input DOCX file path
        input: PathBuf,

        /// Print a JSON array instead of one name per line
        #[arg(long)]
        json: bool,
    },

    /// Fill a DOCX template and render it
    Generate {
        /// Input DOCX file path
        input: PathBuf,

        #[command(flatten)]
        render: RenderArgs,
    },

    /// Manage templates kept in a store directory
    Template {
        /// Store directory
        #[arg(long)]
        store: PathBuf,

        #[command(subcommand)]
        action: TemplateAction,
    },
}

#[derive(Subcommand, Debug)]
enum TemplateAction {
    /// Register a DOCX file as a template
    Add {
        input: PathBuf,
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        owner: Option<String>,
    },
    /// List templates, newest first
    List,
    /// Print a template's metadata as JSON
    Show { id: String },
    /// Change a template's name, description or field metadata
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// JSON file with the full list of field specs
        #[arg(long)]
        fields: Option<PathBuf>,
    },
    /// Delete a template and its file
    Remove { id: String },
    /// Fill a stored template and render it
    Generate {
        id: String,
        #[command(flatten)]
        render: RenderArgs,
    },
}

#[derive(Args, Debug)]
struct RenderArgs {
    /// JSON file with field values
    #[arg(long)]
    values: Option<PathBuf>,

    /// Field value as NAME=VALUE; overrides --values
    #[arg(long = "set", value_name = "NAME=VALUE")]
    set: Vec<String>,

    /// Output format
    #[arg(long, value_enum, default_value = "docx")]
    format: OutputKind,

    /// Output file path (defaults next to the input; HTML goes to stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Reject unknown, missing or mistyped field values
    #[arg(long)]
    strict: bool,

    /// How newlines inside values are written
    #[arg(long, value_enum)]
    line_breaks: Option<LineBreaks>,

    /// Caption and heading language
    #[arg(long, value_enum)]
    locale: Option<Locale>,

    /// JSON file with pipeline options
    #[arg(long)]
    config: Option<PathBuf>,
}

impl RenderArgs {
    fn options(&self) -> Result<PipelineOptions> {
        let mut options = match &self.config {
            Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
            None => PipelineOptions::default(),
        };
        if self.strict {
            options.field_policy = FieldPolicy::Strict;
        }
        if let Some(line_breaks) = self.line_breaks {
            options.fill.line_breaks = line_breaks;
        }
        if let Some(locale) = self.locale {
            options.locale = locale;
        }
        Ok(options)
    }

    fn values(&self) -> Result<FieldValues> {
        let mut values = match &self.values {
            Some(path) => {
                let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(path)?)?;
                values_from_json(&json)?
            }
            None => FieldValues::new(),
        };
        for pair in &self.set {
            let (name, value) = pair.split_once('=').ok_or_else(|| {
                Error::FieldValidation(format!("expected NAME=VALUE, got '{}'", pair))
            })?;
            values.insert(name.trim().to_string(), value.to_string());
        }
        Ok(values)
    }
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Fields { input, json } => {
            let bytes = std::fs::read(&input)?;
            let fields = docfill::extract_fields(&bytes)?;
            for warning in audit_placeholders(&bytes)? {
                eprintln!("warning: {}", warning);
            }
            if json {
                println!("{}", serde_json::to_string(&fields)?);
            } else {
                for field in fields {
                    println!("{}", field);
                }
            }
            Ok(())
        }
        Command::Generate { input, render } => {
            let title = input
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "document".to_string());
            let template = LoadedTemplate::from_bytes(title, std::fs::read(&input)?)?;
            let default_output = input.with_file_name(format!(
                "{}-filled.{}",
                template.title,
                render.format.extension()
            ));
            generate(&template, &render, default_output).await
        }
        Command::Template { store, action } => {
            let store = FsTemplateStore::open(store, UploadPolicy::default()).await?;
            manage(&store, action).await
        }
    }
}

async fn manage(store: &FsTemplateStore, action: TemplateAction) -> Result<()> {
    match action {
        TemplateAction::Add {
            input,
            name,
            description,
            owner,
        } => {
            let filename = input
                .file_name()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            let upload = Upload {
                name,
                description,
                owner,
                filename,
                content_type: None,
                bytes: std::fs::read(&input)?,
            };
            let registration = store.create(upload).await?;
            for warning in &registration.warnings {
                eprintln!("warning: {}", warning);
            }
            println!("{}", registration.template.id);
        }
        TemplateAction::List => {
            for template in store.list().await? {
                println!(
                    "{}\t{}\t{} field(s)\t{}",
                    template.id,
                    template.name,
                    template.fields.len(),
                    template.updated_at.to_rfc3339()
                );
            }
        }
        TemplateAction::Show { id } => {
            let template = store.get(&id).await?;
            println!("{}", serde_json::to_string_pretty(&template)?);
        }
        TemplateAction::Update {
            id,
            name,
            description,
            fields,
        } => {
            let fields: Option<Vec<FieldSpec>> = match fields {
                Some(path) => Some(serde_json::from_str(&std::fs::read_to_string(path)?)?),
                None => None,
            };
            let template = store
                .update(
                    &id,
                    TemplateUpdate {
                        name,
                        description,
                        fields,
                    },
                )
                .await?;
            println!("{}", serde_json::to_string_pretty(&template)?);
        }
        TemplateAction::Remove { id } => {
            store.delete(&id).await?;
            println!("removed {}", id);
        }
        TemplateAction::Generate { id, render } => {
            let template = LoadedTemplate::from_store(store, &id).await?;
            let default_output = PathBuf::from(format!("{}.{}", id, render.format.extension()));
            generate(&template, &render, default_output).await?;
        }
    }
    Ok(())
}

async fn generate(template: &LoadedTemplate, render: &RenderArgs, default_output: PathBuf) -> Result<()> {
    let options = render.options()?;
    let locale = options.locale;
    let values = render.values()?;
    let pipeline = Pipeline::new(options);

    let artifact = pipeline.produce(template, &values, render.format).await?;
    for warning in &artifact.warnings {
        eprintln!("warning: {}", warning);
    }

    if artifact.kind == OutputKind::HtmlPreview {
        let fragment = String::from_utf8_lossy(&artifact.bytes);
        let page = compose_preview(&fragment, &template.title, locale.strategy());
        match &render.output {
            Some(path) => write_output(path, page.as_bytes())?,
            None => print!("{}", page),
        }
        return Ok(());
    }

    let output = render.output.clone().unwrap_or(default_output);
    write_output(&output, &artifact.bytes)
}

fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    std::fs::write(path, bytes)?;
    eprintln!("Wrote {}", path.display());
    Ok(())
}
