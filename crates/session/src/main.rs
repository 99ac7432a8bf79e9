//! Interactive demo over stdin.
//!
//! Every line is a student message, except:
//! `/recs`, `/refresh`, `/reset`, `/generate`, `/status`, `/quit`.

use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};

use topicforge_ai::TemplateGenerator;
use topicforge_core::{SystemClock, UserId, UserPreferences};
use topicforge_recommendations::{CacheRecord, InMemoryCatalog, RecommendationSummary};
use topicforge_session::{GenerationOutcome, SessionController, SessionRegistry, Settings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::from_env().context("loading TOPICFORGE_* settings")?;
    topicforge_observability::init(&settings.logging);

    let catalog = Arc::new(InMemoryCatalog::seeded().with_preferences(UserPreferences {
        level: Some("Master".to_string()),
        field: Some("Génie Informatique".to_string()),
        ..UserPreferences::default()
    }));
    let registry = SessionRegistry::in_memory(
        catalog,
        Arc::new(TemplateGenerator),
        &settings,
        Arc::new(SystemClock),
    );
    let user = UserId::new();
    let session = registry.session(user);
    let notices = session.subscribe_readiness();

    println!("topicforge session {} (type /quit to leave)", session.session_id());
    print_recommendations(&session, false).await;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("reading stdin")? {
        let line = line.trim();
        match line {
            "" => continue,
            "/quit" => break,
            "/recs" => print_recommendations(&session, false).await,
            "/refresh" => print_recommendations(&session, true).await,
            "/reset" => println!("conversation reset, epoch {}", session.reset_conversation()),
            "/status" => {
                let signals = session.signals();
                println!(
                    "phase {} | {} characters | {} keywords",
                    session.current_phase(),
                    signals.user_chars,
                    signals.keyword_hits
                );
            }
            "/generate" => match session.generate_subjects().await {
                Ok(GenerationOutcome::Completed(subjects)) => {
                    for (i, subject) in subjects.iter().enumerate() {
                        println!("{}. {}", i + 1, subject.title);
                        println!("   {}", subject.problem_statement);
                    }
                }
                Ok(GenerationOutcome::Discarded) => println!("generation discarded"),
                Err(err) => println!("cannot generate: {err}"),
            },
            text => match session.send_message(text) {
                Ok(outcome) => {
                    println!("[{}]", outcome.phase);
                    for notice in notices.drain() {
                        println!(
                            "I have enough to suggest subjects ({} characters, {} keywords). Type /generate.",
                            notice.payload().signals.user_chars,
                            notice.payload().signals.keyword_hits
                        );
                    }
                }
                Err(err) => println!("message rejected: {err}"),
            },
        }
    }

    registry.end_session(user);
    Ok(())
}

async fn print_recommendations(session: &SessionController, force: bool) {
    match session.recommendations(force).await {
        Ok(record) => print_record(&record),
        Err(err) => println!("recommendations unavailable ({err}); try /refresh"),
    }
}

fn print_record(record: &CacheRecord) {
    let summary = RecommendationSummary::of(record);
    let label = if summary.degraded { "popular" } else { "for you" };
    println!(
        "{} recommendations ({label}), average {}%, {} strong matches",
        summary.count, summary.average_score, summary.high_match_count
    );
    for entry in record.entries() {
        println!("  {:>5.1}  {}", entry.score, entry.subject.title);
        if let Some(reason) = entry.reasons.first() {
            println!("         {reason}");
        }
    }
}
