use crate::api::server as api_server;
use crate::cli::opts::*;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::io::{stdin, stdout, Write};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use vocabcontext_core::{
    achievement_list, achievement_summary, local_day_start,
    session::{add_items, check_achievements, current_queue, record_answer, study_day},
    study_intensity, today_review_stats, Clock, ProgressSnapshot, ProgressStore, QueueKind,
    SystemClock, SNAPSHOT_VERSION,
};
use vocabcontext_json::{paths::data_root, JsonStore};
use vocabcontext_sqlite::SqliteStore;

pub async fn run_cli(args: Cli) -> Result<()> {
    let store = open_store(&args).await?;
    let clock = SystemClock;
    match args.cmd {
        Command::Add(cmd) => add_cmd(&*store, &clock, cmd).await,
        Command::Queue(cmd) => queue_cmd(&*store, &clock, cmd).await,
        Command::Review(cmd) => review_cmd(&*store, &clock, cmd).await,
        Command::Forget { item } => {
            if store.mark_forgotten(item.trim()).await? {
                println!("marked {}", item.trim());
            } else {
                println!("already marked");
            }
            Ok(())
        }
        Command::Unforget { item } => {
            if store.clear_forgotten(item.trim()).await? {
                println!("cleared {}", item.trim());
            } else {
                println!("not marked");
            }
            Ok(())
        }
        Command::Reset { item } => {
            store.remove_state(item.trim()).await?;
            info!(item = %item.trim(), "review state removed");
            println!("ok");
            Ok(())
        }
        Command::Stats(cmd) => stats_cmd(&*store, &clock, cmd).await,
        Command::Export(cmd) => export_cmd(&*store, &clock, cmd).await,
        Command::Import(cmd) => import_cmd(&*store, cmd).await,
        Command::Api(api) => {
            let addr: std::net::SocketAddr = api.addr.parse()?;
            api_server::run(store, Arc::new(clock), addr).await
        }
        // main runs the TUI on its own runtime
        Command::Tui(_) => bail!("the TUI is started from main"),
    }
}

pub async fn open_store(args: &Cli) -> Result<Arc<dyn ProgressStore>> {
    let root = args.data_dir.clone().unwrap_or_else(data_root);
    match args.store {
        StoreKind::Json => {
            let s = JsonStore::open_in(&root).await?;
            Ok(Arc::new(s))
        }
        StoreKind::Sqlite => {
            let p = args
                .db_path
                .clone()
                .unwrap_or_else(|| root.join("vocabcontext.sqlite3"));
            if let Some(parent) = p.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
            let s = SqliteStore::open_file(&p).await?;
            Ok(Arc::new(s))
        }
    }
}

async fn add_cmd(store: &dyn ProgressStore, clock: &dyn Clock, cmd: AddCmd) -> Result<()> {
    let mut ids = cmd.items;
    if let Some(path) = &cmd.file {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        ids.extend(parse_item_lines(&text));
    }
    if ids.is_empty() {
        bail!("no items given");
    }
    let added = add_items(store, &ids, clock.now()).await?;
    info!(added, given = ids.len(), "items added");
    println!("added {added} new item(s)");
    Ok(())
}

async fn queue_cmd(store: &dyn ProgressStore, clock: &dyn Clock, cmd: QueueCmd) -> Result<()> {
    let queue = current_queue(store, cmd.limit, clock.now()).await?;
    if queue.is_empty() {
        println!("nothing due");
        return Ok(());
    }
    for e in queue {
        println!("{}\t{}\t{}", e.item_id, kind_label(e.kind), e.priority);
    }
    Ok(())
}

async fn review_cmd(store: &dyn ProgressStore, clock: &dyn Clock, cmd: QueueCmd) -> Result<()> {
    let queue = current_queue(store, cmd.limit, clock.now()).await?;
    if queue.is_empty() {
        println!("nothing due");
        return Ok(());
    }
    info!(len = queue.len(), "review queue built");

    let total = queue.len();
    let mut answered = 0usize;
    for (i, entry) in queue.iter().enumerate() {
        println!("\n[{}/{}] {}  ({}, priority {})", i + 1, total, entry.item_id, kind_label(entry.kind), entry.priority);
        if let Some(s) = store.get_state(&entry.item_id).await? {
            println!(
                "level {}  ease {:.2}  seen {}x  missed {}x",
                s.interval_level, s.ease_factor, s.review_count, s.incorrect_count
            );
        }
        println!("[y=know, n=don't know, f=forget, s=skip, q=quit]");
        let answer = loop {
            let line = read_line("> ")?;
            match line.trim().to_lowercase().as_str() {
                "y" | "yes" => break Some(true),
                "n" | "no" => break Some(false),
                "f" | "forget" => {
                    store.mark_forgotten(&entry.item_id).await?;
                    break None;
                }
                "s" | "skip" => break None,
                "q" | "quit" => {
                    println!("\nanswered {answered}");
                    return Ok(());
                }
                _ => println!("enter y, n, f, s, or q"),
            }
        };

        if let Some(correct) = answer {
            let now = clock.now();
            let s = record_answer(store, &entry.item_id, correct, now).await?;
            answered += 1;
            println!("→ next review {}", format_wait(s.next_review - now));
            match check_achievements(store, now).await {
                Ok(fresh) => {
                    for a in fresh {
                        println!("★ achievement unlocked: {} ({})", a.name, a.description);
                    }
                }
                Err(e) => warn!(error = %e, "achievement check failed"),
            }
        }
    }

    println!("\nanswered {answered}");
    Ok(())
}

async fn stats_cmd(store: &dyn ProgressStore, clock: &dyn Clock, cmd: StatsCmd) -> Result<()> {
    let now = clock.now();
    let states = store.load_states().await?;
    let history = store.load_history().await?;
    let today = today_review_stats(&states, now, local_day_start(now));
    let day = study_day(now);

    println!("items\t{}", states.len());
    println!("intensity\t{}", study_intensity(&states, now));
    println!("due\t{}", today.due_count);
    println!("reviewed today\t{}", today.reviewed_count);
    println!("correct/incorrect\t{}/{}", today.correct_count, today.incorrect_count);
    println!("accuracy\t{}%", today.accuracy);
    println!("streak\t{} day(s)", history.streak_days(day));
    println!("study days\t{}", history.total_study_days());
    let unlocked = store.load_achievements().await?;
    let summary = achievement_summary(&unlocked);
    println!(
        "achievements\t{}/{} ({}%)",
        summary.unlocked, summary.total, summary.percentage
    );
    for a in achievement_list(&unlocked).iter().filter(|a| a.unlocked) {
        println!("  ★ {}\t{}", a.achievement.name, a.achievement.description);
    }
    println!();
    for d in history.recent_days(day, cmd.days) {
        println!("{:>5} {:>4} {}", d.label, d.count, "#".repeat(d.count.min(40) as usize));
    }
    Ok(())
}

async fn export_cmd(store: &dyn ProgressStore, clock: &dyn Clock, cmd: ExportCmd) -> Result<()> {
    let snap = store.snapshot(clock.now()).await?;
    match cmd {
        ExportCmd::Json { path } => {
            let s = serde_json::to_string_pretty(&snap)?;
            std::fs::write(&path, s)?;
            println!("wrote {}", path.display());
        }
        ExportCmd::Csv { path } => {
            write_states_csv(&snap, &path)?;
            println!("wrote {}", path.display());
        }
    }
    Ok(())
}

async fn import_cmd(store: &dyn ProgressStore, cmd: ImportCmd) -> Result<()> {
    match cmd {
        ImportCmd::Json { path } => {
            let snap = read_snapshot(&path)?;
            let n = snap.states.len();
            store.restore(snap).await?;
            info!(items = n, path = %path.display(), "progress imported");
            println!("imported {n} item(s)");
        }
    }
    Ok(())
}

// ===== Helpers =====
#[derive(Serialize)]
struct StateRow<'a> {
    item_id: &'a str,
    interval_level: u32,
    ease_factor: f64,
    next_review: DateTime<Utc>,
    last_review: DateTime<Utc>,
    review_count: u32,
    correct_count: u32,
    incorrect_count: u32,
    forgotten: u8,
}

fn write_states_csv(snap: &ProgressSnapshot, path: &Path) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    for (id, s) in &snap.states {
        wtr.serialize(StateRow {
            item_id: id,
            interval_level: s.interval_level,
            ease_factor: s.ease_factor,
            next_review: s.next_review,
            last_review: s.last_review,
            review_count: s.review_count,
            correct_count: s.correct_count,
            incorrect_count: s.incorrect_count,
            forgotten: u8::from(snap.forgotten.contains(id)),
        })?;
    }
    wtr.flush()?;
    Ok(())
}

fn read_snapshot(path: &Path) -> Result<ProgressSnapshot> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let snap: ProgressSnapshot = serde_json::from_str(&data)?;
    if snap.version > SNAPSHOT_VERSION {
        bail!("export version {} is newer than supported ({SNAPSHOT_VERSION})", snap.version);
    }
    Ok(snap)
}

pub fn parse_item_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect()
}

pub fn kind_label(kind: QueueKind) -> &'static str {
    match kind {
        QueueKind::Forgotten => "forgotten",
        QueueKind::Review => "review",
    }
}

/// Coarse "in 2h 5m" style wait.
pub fn format_wait(d: Duration) -> String {
    let mins = d.num_minutes().max(0);
    if mins < 60 {
        format!("in {mins}m")
    } else if mins < 24 * 60 {
        format!("in {}h {}m", mins / 60, mins % 60)
    } else {
        format!("in {}d {}h", mins / (24 * 60), (mins % (24 * 60)) / 60)
    }
}

fn read_line(prompt: &str) -> Result<String> {
    print!("{prompt}");
    stdout().flush().ok();
    let mut s = String::new();
    stdin().read_line(&mut s)?;
    Ok(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use vocabcontext_core::{
        memory::MemoryStore, FixedClock, ForgottenSet, ReviewState, ReviewStates, StudyHistory,
    };

    #[test]
    fn item_file_skips_comments_and_blanks() {
        let v = parse_item_lines("# words\napple\n\n  banana  \n#skip\ncherry\n");
        assert_eq!(v, vec!["apple", "banana", "cherry"]);
    }

    #[test]
    fn waits_are_human_readable() {
        assert_eq!(format_wait(Duration::minutes(75)), "in 1h 15m");
        assert_eq!(format_wait(Duration::seconds(750)), "in 12m");
        assert_eq!(format_wait(Duration::minutes(30240 * 2)), "in 42d 0h");
    }

    #[test]
    fn csv_export_marks_forgotten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let t = Utc.with_ymd_and_hms(2024, 1, 5, 0, 0, 0).unwrap();
        let states: ReviewStates = [("a".to_string(), ReviewState::new(t))].into_iter().collect();
        let forgotten: ForgottenSet = ["a"].into_iter().collect();
        let snap = ProgressSnapshot::new(t, states, forgotten, StudyHistory::new());

        write_states_csv(&snap, &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert!(lines.next().unwrap().starts_with("item_id,interval_level,ease_factor"));
        let row = lines.next().unwrap();
        assert!(row.starts_with("a,0,2.5,"));
        assert!(row.ends_with(",0,0,0,1"));
    }

    #[test]
    fn snapshot_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snap.json");
        let t = Utc.with_ymd_and_hms(2024, 1, 5, 0, 0, 0).unwrap();
        let states: ReviewStates = [("x".to_string(), ReviewState::new(t))].into_iter().collect();
        let snap = ProgressSnapshot::new(t, states, ForgottenSet::new(), StudyHistory::new());
        std::fs::write(&path, serde_json::to_string(&snap).unwrap()).unwrap();
        assert_eq!(read_snapshot(&path).unwrap(), snap);

        let mut newer = snap.clone();
        newer.version = SNAPSHOT_VERSION + 1;
        std::fs::write(&path, serde_json::to_string(&newer).unwrap()).unwrap();
        assert!(read_snapshot(&path).is_err());
    }

    #[tokio::test]
    async fn export_is_stamped_by_the_clock() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.json");
        let t = Utc.with_ymd_and_hms(2024, 3, 3, 3, 3, 3).unwrap();
        let store = MemoryStore::new();
        record_answer(&store, "w", true, t).await.unwrap();
        store
            .unlock_achievements(&["first_word".to_string()])
            .await
            .unwrap();

        export_cmd(&store, &FixedClock::new(t), ExportCmd::Json { path: path.clone() })
            .await
            .unwrap();
        let snap = read_snapshot(&path).unwrap();
        assert_eq!(snap.exported_at, t);
        assert!(snap.achievements.contains("first_word"));
        assert_eq!(snap.states.len(), 1);
    }
}
