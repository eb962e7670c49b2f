use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use snowscope_ai::{
    generate_glossary, generate_lineage, CodeBlob, GlossaryResult, LineageCsv, LineageDiagram,
    LineageOptions, LineageTheme, OpenAiClient, SemanticModelClient, SemanticModelInputs,
};
use snowscope_catalog::{CatalogWalker, SnowflakeConnection, StageAccess, YamlFile};
use snowscope_core::{CatalogTree, Config, ScriptSummary, StageRef, StatementResult};
use snowscope_engine::ScriptRunner;

/// Snowscope - Browse Snowflake schemas, run SQL scripts and generate metadata with an LLM
#[derive(Parser)]
#[command(name = "snowscope")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "Object names are case-sensitive; pass them as `snowscope objects` prints them.")]
struct Cli {
    /// Path to config file (default: snowscope.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print machine-readable JSON
    #[arg(long, global = true)]
    json: bool,

    /// Snowflake account identifier
    #[arg(long, global = true, env = "SNOWFLAKE_ACCOUNT")]
    account: Option<String>,

    /// Snowflake user
    #[arg(long, global = true, env = "SNOWFLAKE_USER")]
    user: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List databases, schemas, tables and views
    Objects,

    /// List every object in a schema, by category
    Schema { database: String, schema: String },

    /// Describe the columns of a table or view
    Columns {
        database: String,
        schema: String,
        object: String,

        /// `table` or `view`
        #[arg(short = 't', long = "type", default_value = "table")]
        object_type: String,
    },

    /// List the stages of a database
    Stages { database: String },

    /// List the files in a stage (`database.schema.stage`)
    Files {
        stage: String,

        /// Switch the session to this database first
        #[arg(long)]
        database: Option<String>,

        /// Include size, md5 and last modified
        #[arg(short, long)]
        long: bool,
    },

    /// Print a staged file
    Read { stage: String, file: String },

    /// Read and parse every YAML file in a stage
    Yaml {
        stage: String,

        #[arg(long)]
        database: Option<String>,
    },

    /// Print a URL for a staged file
    Url {
        stage: String,
        file: String,

        /// Build a permanent file URL instead of a presigned one
        #[arg(long)]
        permanent: bool,
    },

    /// Execute a multi-statement SQL script
    Run {
        /// Local script path, or file name within `--stage`
        script: String,

        /// Read the script from this stage
        #[arg(long)]
        stage: Option<String>,
    },

    /// Generate a business glossary from a semantic YAML file
    Glossary { yaml: PathBuf },

    /// Generate a Graphviz lineage diagram
    Lineage {
        /// Lineage CSV (one edge per row)
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Pipeline source files (.sql, .py, .java, .scala)
        #[arg(long = "code")]
        code: Vec<PathBuf>,

        /// Focus on this node
        #[arg(long)]
        target: Option<String>,

        /// Hops around the target to keep
        #[arg(long)]
        max_hops: Option<u32>,

        /// vibrant, muted or monochrome
        #[arg(long)]
        theme: Option<LineageTheme>,

        #[arg(long)]
        detail_level: Option<String>,

        /// Ask for SQL excerpts on transformation nodes
        #[arg(long)]
        sql_snippets: bool,

        #[arg(long, default_value_t = 180)]
        snippet_max_chars: usize,

        #[arg(long)]
        no_edge_labels: bool,

        #[arg(long)]
        no_tooltips: bool,

        #[arg(long)]
        no_ctes: bool,

        #[arg(long)]
        no_column_lineage: bool,

        #[arg(long)]
        no_file_sources: bool,

        /// Free-text instructions appended to the prompt
        #[arg(long)]
        instructions: Option<String>,

        /// Write the diagram here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate a semantic model through the semantic model API
    SemanticModel {
        #[arg(long, env = "SEMANTIC_MODEL_API_URL")]
        api_url: String,

        /// Environment variable holding the API key
        #[arg(long, default_value = "SEMANTIC_MODEL_API_KEY")]
        api_key_env: String,

        /// Fully qualified table (repeatable)
        #[arg(long = "table", required = true)]
        tables: Vec<String>,

        /// Column name (repeatable)
        #[arg(long = "column")]
        columns: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    // Load config if specified
    let config = if let Some(config_path) = &cli.config {
        Config::from_file(config_path)?
    } else if Path::new("snowscope.toml").exists() {
        Config::from_file(Path::new("snowscope.toml"))?
    } else {
        if cli.verbose {
            eprintln!("{}", "No config file found, using defaults".yellow());
        }
        Config::default()
    };

    match &cli.command {
        Commands::Objects => objects_command(&cli, &config).await,
        Commands::Schema { database, schema } => schema_command(&cli, &config, database, schema).await,
        Commands::Columns {
            database,
            schema,
            object,
            object_type,
        } => columns_command(&cli, &config, database, schema, object, object_type).await,
        Commands::Stages { database } => stages_command(&cli, &config, database).await,
        Commands::Files {
            stage,
            database,
            long,
        } => files_command(&cli, &config, stage, database.as_deref(), *long).await,
        Commands::Read { stage, file } => read_command(&cli, &config, stage, file).await,
        Commands::Yaml { stage, database } => yaml_command(&cli, &config, stage, database.as_deref()).await,
        Commands::Url {
            stage,
            file,
            permanent,
        } => url_command(&cli, &config, stage, file, *permanent).await,
        Commands::Run { script, stage } => run_command(&cli, &config, script, stage.as_deref()).await,
        Commands::Glossary { yaml } => glossary_command(&cli, &config, yaml).await,
        Commands::Lineage {
            csv,
            code,
            target,
            max_hops,
            theme,
            detail_level,
            sql_snippets,
            snippet_max_chars,
            no_edge_labels,
            no_tooltips,
            no_ctes,
            no_column_lineage,
            no_file_sources,
            instructions,
            output,
        } => {
            let mut options = LineageOptions::from_config(&config.lineage);
            options.target = target.clone();
            if let Some(hops) = max_hops {
                options.max_hops = *hops;
            }
            if let Some(theme) = theme {
                options.theme = *theme;
            }
            if let Some(level) = detail_level {
                options.detail_level = level.clone();
            }
            options.include_sql_snippets = *sql_snippets;
            options.snippet_max_chars = *snippet_max_chars;
            options.show_edge_labels = !no_edge_labels;
            options.show_node_tooltips = !no_tooltips;
            options.include_ctes = !no_ctes;
            options.include_column_lineage = !no_column_lineage;
            options.include_file_and_stage_sources = !no_file_sources;
            options.additional_instructions = instructions.clone().unwrap_or_default();

            lineage_command(&cli, &config, csv.as_deref(), code, &options, output.as_deref()).await
        }
        Commands::SemanticModel {
            api_url,
            api_key_env,
            tables,
            columns,
        } => semantic_model_command(api_url, api_key_env, tables, columns).await,
    }
}

/// Open a Snowflake session from flags, environment and config
async fn connect(cli: &Cli, config: &Config) -> Result<SnowflakeConnection> {
    let settings = &config.connection;

    let account = cli
        .account
        .clone()
        .or_else(|| settings.account.clone())
        .ok_or_else(|| anyhow::anyhow!("No Snowflake account. Pass --account, set SNOWFLAKE_ACCOUNT or add it to [connection]."))?;
    let user = cli
        .user
        .clone()
        .or_else(|| settings.user.clone())
        .ok_or_else(|| anyhow::anyhow!("No Snowflake user. Pass --user, set SNOWFLAKE_USER or add it to [connection]."))?;
    let token = std::env::var(&settings.token_env)
        .with_context(|| format!("Personal access token not found in ${}", settings.token_env))?;

    if cli.verbose {
        eprintln!("{} {} as {}...", "Connecting to".cyan(), account, user);
    }

    let mut builder = SnowflakeConnection::builder(account, user, token);
    if let Some(role) = &settings.role {
        builder = builder.with_role(role.as_str());
    }
    if let Some(warehouse) = &settings.warehouse {
        builder = builder.with_warehouse(warehouse.as_str());
    }
    if let Some(database) = &settings.database {
        builder = builder.with_database(database.as_str());
    }
    if let Some(schema) = &settings.schema {
        builder = builder.with_schema(schema.as_str());
    }

    let conn = builder.connect().await?;

    if cli.verbose {
        eprintln!("{}", "✓ Connection successful".green());
    }

    Ok(conn)
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn objects_command(cli: &Cli, config: &Config) -> Result<()> {
    let conn = connect(cli, config).await?;
    let tree = CatalogWalker::new(&conn).list_data_objects().await?;

    if cli.json {
        return print_json(&tree);
    }

    print_tree(&tree);
    Ok(())
}

fn print_tree(tree: &CatalogTree) {
    for (database, schemas) in tree.iter() {
        println!("{}", database.bold().bright_blue());
        for (schema, objects) in schemas {
            println!("  {}", schema.cyan());
            for table in objects.tables() {
                println!("    {} {}", "table".dimmed(), table);
            }
            for view in objects.views() {
                println!("    {} {}", "view ".dimmed(), view);
            }
        }
    }
}

async fn schema_command(cli: &Cli, config: &Config, database: &str, schema: &str) -> Result<()> {
    let conn = connect(cli, config).await?;
    let objects = CatalogWalker::new(&conn).schema_objects(database, schema).await?;

    if cli.json {
        return print_json(&objects);
    }

    println!("{}", format!("{}.{}", database, schema).bold().bright_blue());
    for (category, names) in objects.iter() {
        println!("  {} ({})", category.to_string().cyan(), names.len());
        for name in names {
            println!("    {}", name);
        }
    }
    Ok(())
}

async fn columns_command(
    cli: &Cli,
    config: &Config,
    database: &str,
    schema: &str,
    object: &str,
    object_type: &str,
) -> Result<()> {
    let conn = connect(cli, config).await?;
    let columns = CatalogWalker::new(&conn)
        .columns(database, schema, object, object_type)
        .await?;

    if cli.json {
        return print_json(&columns);
    }

    for column in &columns {
        let nullable = if column.is_nullable() { "NULL" } else { "NOT NULL" };
        print!("  {:<32} {:<16} {}", column.name.bold(), column.type_name(), nullable.dimmed());
        if !column.default.is_empty() {
            print!(" DEFAULT {}", column.default);
        }
        println!();
    }
    Ok(())
}

async fn stages_command(cli: &Cli, config: &Config, database: &str) -> Result<()> {
    let conn = connect(cli, config).await?;
    let stages = CatalogWalker::new(&conn).list_stages(database).await?;

    if cli.json {
        return print_json(&stages);
    }

    for (schema, stage) in &stages {
        println!("{}.{}.{}", database, schema.cyan(), stage.bold());
    }
    Ok(())
}

async fn files_command(
    cli: &Cli,
    config: &Config,
    stage: &str,
    database: Option<&str>,
    long: bool,
) -> Result<()> {
    let stage: StageRef = stage.parse()?;
    let conn = connect(cli, config).await?;
    let access = StageAccess::new(&conn);

    if long {
        let entries = access.list_file_entries(&stage, database).await?;
        if cli.json {
            return print_json(&entries);
        }
        for entry in &entries {
            println!(
                "{:>12}  {:<32}  {}",
                entry.size,
                entry.last_modified.as_deref().unwrap_or("-").dimmed(),
                entry.name
            );
        }
        return Ok(());
    }

    let files = access.list_files(&stage, database).await?;
    if cli.json {
        return print_json(&files);
    }
    for file in &files {
        println!("{}", file);
    }
    Ok(())
}

async fn read_command(cli: &Cli, config: &Config, stage: &str, file: &str) -> Result<()> {
    let stage: StageRef = stage.parse()?;
    let conn = connect(cli, config).await?;

    let content = StageAccess::new(&conn).read_file(&stage, file).await?;
    print!("{}", content);
    Ok(())
}

async fn yaml_command(cli: &Cli, config: &Config, stage: &str, database: Option<&str>) -> Result<()> {
    let stage: StageRef = stage.parse()?;
    let conn = connect(cli, config).await?;

    let files = StageAccess::new(&conn).read_yaml_files(&stage, database).await?;

    if cli.json {
        return print_json(&files);
    }

    if files.is_empty() {
        println!("{}", "No YAML files found".yellow());
    }
    for (name, file) in &files {
        match file {
            YamlFile::Parsed(_) => println!("{} {}", "✓".green(), name),
            YamlFile::Error(message) => println!("{} {}: {}", "✗".red(), name, message),
        }
    }
    Ok(())
}

async fn url_command(cli: &Cli, config: &Config, stage: &str, file: &str, permanent: bool) -> Result<()> {
    let stage: StageRef = stage.parse()?;
    let conn = connect(cli, config).await?;
    let access = StageAccess::new(&conn);

    let url = if permanent {
        access.stage_file_url(&stage, file).await?
    } else {
        access.presigned_url(&stage, file).await?
    };
    println!("{}", url);
    Ok(())
}

async fn run_command(cli: &Cli, config: &Config, script: &str, stage: Option<&str>) -> Result<()> {
    let conn = connect(cli, config).await?;
    let runner = ScriptRunner::new(&conn);

    let results = match stage {
        Some(stage) => {
            let stage: StageRef = stage.parse()?;
            let access = StageAccess::new(&conn);
            runner.execute_from_stage(&access, &stage, script).await?
        }
        None => runner.execute_file(script).await?,
    };
    let summary = ScriptSummary::from_results(&results);

    if cli.json {
        print_json(&results)?;
    } else {
        print_results(&results, &summary);
    }

    if summary.all_succeeded() {
        Ok(())
    } else {
        Err(anyhow::anyhow!(
            "{} of {} statements failed",
            summary.failed,
            summary.statements
        ))
    }
}

fn print_results(results: &[StatementResult], summary: &ScriptSummary) {
    for (idx, result) in results.iter().enumerate() {
        let first_line = result.statement.lines().next().unwrap_or_default();
        if result.success {
            println!(
                "{} [{}] {} {}",
                "✓".green(),
                idx + 1,
                first_line,
                format!("({} rows)", result.rows_affected).dimmed()
            );
        } else {
            println!("{} [{}] {}", "✗".red(), idx + 1, first_line);
            println!("    {}", result.error.red());
        }
    }

    println!();
    println!(
        "{} statements, {} succeeded, {} failed, {} rows affected",
        summary.statements,
        summary.succeeded.to_string().green(),
        summary.failed.to_string().red(),
        summary.rows_affected
    );
}

async fn glossary_command(cli: &Cli, config: &Config, yaml: &Path) -> Result<()> {
    let content = std::fs::read_to_string(yaml)
        .with_context(|| format!("Failed to read {}", yaml.display()))?;
    let client = OpenAiClient::from_config(&config.llm)?;

    if cli.verbose {
        eprintln!("{} {}...", "Generating glossary with".cyan(), config.llm.model);
    }

    let glossary = generate_glossary(&client, &config.llm, &content).await?;

    if cli.json {
        return print_json(&glossary.to_json());
    }

    match &glossary {
        GlossaryResult::Structured(_) => {
            for column in glossary.columns() {
                println!(
                    "{}.{}",
                    column["table"].as_str().unwrap_or("?").cyan(),
                    column["column"].as_str().unwrap_or("?").bold()
                );
                if let Some(definition) = column["definition"].as_str() {
                    println!("    {}", definition);
                }
                if let Some(synonyms) = column["synonyms"].as_array() {
                    let synonyms: Vec<&str> = synonyms.iter().filter_map(|s| s.as_str()).collect();
                    if !synonyms.is_empty() {
                        println!("    {} {}", "synonyms:".dimmed(), synonyms.join(", "));
                    }
                }
            }
            for term in glossary.terms() {
                println!(
                    "{} {}",
                    term["term"].as_str().unwrap_or("?").bold().bright_blue(),
                    term["definition"].as_str().unwrap_or_default()
                );
            }
        }
        GlossaryResult::Raw(text) => {
            eprintln!("{}", "⚠ Reply was not JSON; showing raw text".yellow());
            println!("{}", text);
        }
    }
    Ok(())
}

async fn lineage_command(
    cli: &Cli,
    config: &Config,
    csv: Option<&Path>,
    code: &[PathBuf],
    options: &LineageOptions,
    output: Option<&Path>,
) -> Result<()> {
    let csv = match csv {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            Some(LineageCsv::parse(&text)?)
        }
        None => None,
    };

    let blobs = code
        .iter()
        .map(|path| {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| path.display().to_string());
            Ok(CodeBlob::new(name, content))
        })
        .collect::<Result<Vec<_>>>()?;

    let client = OpenAiClient::from_config(&config.llm)?;

    if cli.verbose {
        eprintln!(
            "{} {} ({} theme)...",
            "Generating lineage with".cyan(),
            config.llm.model,
            options.theme
        );
    }

    let diagram = generate_lineage(&client, &config.llm, csv.as_ref(), &blobs, options).await?;

    if let LineageDiagram::Raw(_) = diagram {
        eprintln!("{}", "⚠ Reply is not a DOT digraph; writing raw text".yellow());
    }

    match output {
        Some(path) => {
            std::fs::write(path, diagram.text())
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("{} {}", "✓ Diagram written to".green(), path.display());
        }
        None => println!("{}", diagram.text()),
    }
    Ok(())
}

async fn semantic_model_command(
    api_url: &str,
    api_key_env: &str,
    tables: &[String],
    columns: &[String],
) -> Result<()> {
    let api_key = std::env::var(api_key_env)
        .with_context(|| format!("Semantic model API key not found in ${}", api_key_env))?;
    let client = SemanticModelClient::new(api_url, api_key)?;

    let response = client
        .generate(&SemanticModelInputs {
            tables: tables.to_vec(),
            columns: columns.to_vec(),
        })
        .await?;

    match response.get("semantic_model_yaml").and_then(|v| v.as_str()) {
        Some(yaml) => print!("{}", yaml),
        None => print_json(&response)?,
    }
    Ok(())
}
