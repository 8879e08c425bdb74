//! Interactive terminal session.
//!
//! A long-running prompt loop: enter a query, pick an engine, browse the
//! result list, summarise a result, optionally export the report as PDF.
//! Every failure is reported and the session stays usable.

use crate::config::Config;
use crate::report;
use crate::search::{Engine, SearchClient, SearchResult};
use crate::session::{Pick, PipelineOutput, SessionController, SessionState};
use crate::{agent::Summarizer, fetch::ContentFetcher};
use anyhow::Result;
use colored::Colorize;
use dialoguer::{Confirm, Input, Select};

/// Run the interactive research session until the user quits
pub async fn run(config: Config) -> Result<()> {
    let search_client = SearchClient::new(&config)?;
    let summarizer = Summarizer::new(&config)?;
    if config.api.firecrawl_key.is_none() {
        println!(
            "{}",
            "Note: no Firecrawl key configured; falling back to plain HTTP fetch.".yellow()
        );
    }
    let fetcher = ContentFetcher::new(&config);
    let controller = SessionController::new(fetcher, summarizer);
    let mut state = SessionState::default();

    println!("{}", "forska - research assistant".bold());
    println!("Search academic literature, summarise a paper, export a PDF report.\n");

    loop {
        let query: String = Input::new()
            .with_prompt("Research query (empty to quit)")
            .allow_empty(true)
            .interact_text()?;
        let query = query.trim().to_string();
        if query.is_empty() {
            break;
        }

        let engine_index = Select::new()
            .with_prompt("Search engine")
            .items(&Engine::ALL)
            .default(0)
            .interact()?;
        let engine = Engine::ALL[engine_index];

        println!("{}", format!("Searching {}...", engine).cyan());
        let results = match search_client.search(&query, engine).await {
            Ok(results) => results,
            Err(error) => {
                // Prior results stay usable; only the failed search is reported
                println!("{}", format!("Search failed: {}", error).red());
                continue;
            }
        };

        state.record_results(&query, results);

        if state.results.is_empty() {
            println!(
                "{}",
                "No results found. Try a different query or engine.".yellow()
            );
            continue;
        }

        browse_results(&mut state, &controller, &config).await?;
    }

    Ok(())
}

/// Result list menu: summarise picks until the user starts a new search
async fn browse_results(
    state: &mut SessionState,
    controller: &SessionController,
    config: &Config,
) -> Result<()> {
    loop {
        print_results(&state.results);

        let mut items: Vec<String> = state
            .results
            .iter()
            .enumerate()
            .map(|(index, result)| format!("Summarise #{}: {}", index + 1, result.title))
            .collect();
        items.push("New search".to_string());

        let choice = Select::new()
            .with_prompt("Pick a paper to summarise")
            .items(&items)
            .default(0)
            .interact()?;

        if choice == state.results.len() {
            return Ok(());
        }

        match state.begin_pick(choice) {
            Pick::Accepted => {}
            Pick::Busy => {
                // Single-threaded loop; a pick can never race a running pipeline
                println!("{}", "A summarisation is already in progress.".yellow());
                continue;
            }
            Pick::Invalid => {
                println!("{}", "That result is no longer available.".red());
                continue;
            }
        }

        let picked = state
            .selected_result()
            .cloned()
            .expect("pick was just accepted");

        println!(
            "{}",
            format!("Fetching content for \"{}\" (this may take a while)...", picked.title).cyan()
        );

        match controller.run_pipeline(&picked, &state.query).await {
            Ok(output) => {
                state.finish_pick(true);
                show_summary(&picked, &output);
                offer_export(&output, config)?;
            }
            Err(error) => {
                state.finish_pick(false);
                println!("{}", format!("Summarisation failed: {}", error).red());
                println!("The result list is still available; pick another paper.");
            }
        }
    }
}

/// Print the numbered result list with links and snippets
pub fn print_results(results: &[SearchResult]) {
    println!(
        "\n{}",
        format!("Search results ({} papers found):", results.len()).bold()
    );
    for (index, result) in results.iter().enumerate() {
        println!("\n{} {}", format!("#{}", index + 1).bold(), result.title);
        println!("   {}", result.link.dimmed());
        if !result.snippet.is_empty() {
            println!("   {}", result.snippet);
        }
    }
    println!();
}

fn show_summary(picked: &SearchResult, output: &PipelineOutput) {
    println!(
        "{}",
        format!("Content fetched via {}.", output.fetched_via).green()
    );
    println!("\n=== {} ===\n", picked.title);
    println!("{}\n", output.summary.text);
}

/// Offer to write the rendered PDF next to the configured output directory.
/// A render failure is reported but does not invalidate the summary.
fn offer_export(output: &PipelineOutput, config: &Config) -> Result<()> {
    let pdf = match (&output.pdf, &output.render_error) {
        (Some(pdf), _) => pdf,
        (None, Some(error)) => {
            println!(
                "{}",
                format!("PDF generation failed: {} (summary shown above)", error).yellow()
            );
            return Ok(());
        }
        (None, None) => return Ok(()),
    };

    let export = Confirm::new()
        .with_prompt("Download summary as PDF?")
        .default(true)
        .interact()?;
    if !export {
        return Ok(());
    }

    let filename = format!("{}.pdf", report::clean_filename(&output.summary.title));
    let path = config.report.output_dir.join(filename);
    match std::fs::write(&path, pdf) {
        Ok(()) => println!("{}", format!("Report written to {}", path.display()).green()),
        Err(error) => println!("{}", format!("Could not write report: {}", error).red()),
    }

    Ok(())
}
