//! Command implementations.

use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use colored::Colorize;
use tracing::debug;

use printvendo_econ::{Model, PricingTable};
use printvendo_llm::{CompletionClient, OpenAiApi, OpenAiConfig};
use printvendo_mailbox::{DriveConfig, DriveMailbox};
use printvendo_session::{
    watch_payment, InMemorySessionStore, PollConfig, RetryPolicy, SessionManager, WatchOutcome,
};
use printvendo_types::{format_amount, ColorMode, MachineId, PaymentKind};

use crate::cli::Commands;
use crate::config::KioskConfig;
use crate::signals::shutdown_signal;

/// The manager wired to the production adapters.
pub type KioskManager = SessionManager<DriveMailbox, OpenAiApi>;

/// Build the manager from the loaded configuration.
pub fn build_manager(config: &KioskConfig) -> KioskManager {
    let client = reqwest::Client::new();

    let mut drive = DriveConfig::new(
        config.drive.root_folder_id.clone(),
        config.drive.access_token.clone(),
    );
    if let Some(base) = &config.drive.api_base {
        drive = drive.with_api_base(base.clone());
    }
    if let Some(base) = &config.drive.upload_base {
        drive = drive.with_upload_base(base.clone());
    }
    let mailbox = DriveMailbox::new(client.clone(), drive);

    let mut completion = OpenAiConfig::new(config.completion.api_key.clone())
        .with_model(config.completion.model.clone());
    if let Some(base) = &config.completion.base_url {
        completion = completion.with_base_url(base.clone());
    }
    let api = OpenAiApi::new(client, completion);

    let pricing = PricingTable::default()
        .with_model(model_from_name(&config.completion.model))
        .with_markup(config.pricing.markup)
        .with_fx_rate(config.pricing.fx_rate);

    SessionManager::new(
        mailbox,
        CompletionClient::new(api),
        Arc::new(InMemorySessionStore::new()),
    )
    .with_pricing(pricing)
}

fn model_from_name(name: &str) -> Model {
    if name.starts_with("gpt-4.5") {
        Model::Gpt45
    } else if name.starts_with("gpt-4") {
        Model::Gpt4
    } else {
        Model::Gpt35Turbo
    }
}

/// Execute one CLI command.
pub async fn dispatch(
    command: Commands,
    manager: Arc<KioskManager>,
    machine: MachineId,
) -> anyhow::Result<()> {
    match command {
        Commands::Provision => provision(&manager, &machine).await,
        Commands::Cleanup => cleanup(&manager, &machine).await,
        Commands::Run {
            prompt,
            file,
            document,
            color,
            save_pdf,
            pdf,
            skip_print,
        } => {
            let options = RunOptions {
                prompt,
                file,
                document,
                color,
                save_pdf,
                pdf,
                skip_print,
            };
            run_session(manager, machine, options).await
        }
        Commands::Status => status(&manager, &machine).await,
        Commands::Response => response(&manager, &machine).await,
        Commands::Cost => cost(&manager, &machine).await,
    }
}

async fn provision(manager: &KioskManager, machine: &MachineId) -> anyhow::Result<()> {
    manager.provision_machine(machine).await?;
    println!("{} mailbox folder ready for {machine}", "provisioned".green());
    Ok(())
}

async fn cleanup(manager: &KioskManager, machine: &MachineId) -> anyhow::Result<()> {
    let outcome = manager.cleanup_session(machine).await?;
    println!(
        "{} removed {} mailbox entries for {machine}",
        "cleaned".green(),
        outcome.files_deleted
    );
    Ok(())
}

struct RunOptions {
    prompt: Option<String>,
    file: Option<PathBuf>,
    document: Option<PathBuf>,
    color: bool,
    save_pdf: bool,
    pdf: Option<PathBuf>,
    skip_print: bool,
}

async fn run_session(
    manager: Arc<KioskManager>,
    machine: MachineId,
    options: RunOptions,
) -> anyhow::Result<()> {
    manager.register(&machine).await?;
    println!("{} machine {machine}", "registered".green());

    let prompt = resolve_prompt(options.prompt, options.file)?;
    let document = options
        .document
        .map(|path| {
            std::fs::read_to_string(&path)
                .with_context(|| format!("cannot read document {}", path.display()))
        })
        .transpose()?;

    let submit = manager
        .submit_content(&machine, &prompt, document.as_deref())
        .await?;
    println!(
        "{} estimated cost {}",
        "submitted".green(),
        format_amount(submit.estimated_cost).bold()
    );

    // Upstream hiccups are transparent to the kiosk user; nothing is billed
    // until a completion succeeds.
    let report = RetryPolicy::default()
        .execute(|| manager.generate_response(&machine))
        .await?;
    println!(
        "{} {} input + {} output tokens, final cost {}",
        "generated".green(),
        report.input_tokens,
        report.output_tokens,
        format_amount(report.final_cost).bold()
    );

    let amount = manager
        .request_payment(&machine, PaymentKind::Completion)
        .await?;
    println!(
        "{} please pay {} at the terminal",
        "awaiting payment".yellow(),
        format_amount(amount).bold()
    );

    let cancel = shutdown_signal();
    match watch_payment(
        Arc::clone(&manager),
        machine.clone(),
        PaymentKind::Completion,
        PollConfig::payment(),
        cancel.clone(),
    )
    .await?
    {
        WatchOutcome::Completed(()) => println!("{}", "payment confirmed".green().bold()),
        WatchOutcome::Cancelled => bail!("cancelled while waiting for payment"),
    }

    let poll = manager.poll_response(&machine).await?;
    let text = poll.text.unwrap_or_default();
    println!("\n{text}\n");

    if options.skip_print {
        return Ok(());
    }

    let pdf_bytes = options
        .pdf
        .map(|path| {
            std::fs::read(&path).with_context(|| format!("cannot read pdf {}", path.display()))
        })
        .transpose()?;
    let color_mode = if options.color {
        ColorMode::Color
    } else {
        ColorMode::Monochrome
    };

    let artifact = manager
        .prepare_artifact(
            &machine,
            &text,
            color_mode,
            options.save_pdf,
            pdf_bytes.as_deref(),
        )
        .await?;
    debug!(file_id = %artifact.file_id, references = artifact.drive_references.len(), "artifact stored");
    println!(
        "{} {} pages, pay {} to print",
        "prepared".green(),
        manager
            .session(&machine)
            .and_then(|s| s.print_job)
            .map(|j| j.page_count)
            .unwrap_or(1),
        format_amount(artifact.total_cost).bold()
    );

    match watch_payment(
        Arc::clone(&manager),
        machine.clone(),
        PaymentKind::Print,
        PollConfig::payment(),
        cancel,
    )
    .await?
    {
        WatchOutcome::Completed(()) => {
            println!("{}", "print payment confirmed, job released".green().bold());
        }
        WatchOutcome::Cancelled => bail!("cancelled while waiting for print payment"),
    }

    Ok(())
}

fn resolve_prompt(prompt: Option<String>, file: Option<PathBuf>) -> anyhow::Result<String> {
    if let Some(prompt) = prompt {
        return Ok(prompt);
    }
    if let Some(path) = file {
        return std::fs::read_to_string(&path)
            .with_context(|| format!("cannot read prompt file {}", path.display()));
    }
    let mut buffer = String::new();
    std::io::stdin()
        .read_to_string(&mut buffer)
        .context("cannot read prompt from stdin")?;
    Ok(buffer)
}

async fn status(manager: &KioskManager, machine: &MachineId) -> anyhow::Result<()> {
    manager.register(machine).await?;

    let prompt = manager.get_prompt(machine).await?;
    let response = manager.poll_response(machine).await?;
    let cost = manager.get_cost_details(machine).await?;

    println!("machine:  {machine}");
    println!(
        "prompt:   {}",
        prompt.as_deref().unwrap_or("<not submitted>")
    );
    println!(
        "response: {}",
        if response.ready { "ready" } else { "pending" }
    );
    match cost {
        Some(cost) => println!(
            "cost:     {} ({} in / {} out tokens)",
            format_amount(cost.final_cost),
            cost.input_tokens,
            cost.output_tokens
        ),
        None => println!("cost:     <not published>"),
    }
    Ok(())
}

async fn response(manager: &KioskManager, machine: &MachineId) -> anyhow::Result<()> {
    manager.register(machine).await?;
    let poll = manager.poll_response(machine).await?;
    match poll.text {
        Some(text) => println!("{text}"),
        None => println!("{}", "response not ready".yellow()),
    }
    Ok(())
}

async fn cost(manager: &KioskManager, machine: &MachineId) -> anyhow::Result<()> {
    manager.register(machine).await?;
    match manager.get_cost_details(machine).await? {
        Some(report) => println!("{}", serde_json::to_string_pretty(&report)?),
        None => println!("{}", "cost record not published".yellow()),
    }
    Ok(())
}
