use std::collections::BTreeSet;
use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate};
use clap::Parser;
use serde_json::json;
use tracing::{info, warn};

use court_assign::attendance::{self, DailyStatus};
use court_assign::logging::setup_logging;
use court_assign::report::{format_grid, member_list, render_table, summary_lines, write_csv};
use court_assign::roster;
use court_assign::{partition_with_stop, AssignConfig, Participant, Pool, PracticeType};

#[derive(Parser)]
#[command(name = "court-assign")]
#[command(about = "Split practice attendees into balanced court groups", long_about = None)]
struct Cli {
    /// Member roster CSV. Read from stdin when omitted
    #[arg(long)]
    roster: Option<PathBuf>,

    /// Daily status log CSV (absence / lateness reports)
    #[arg(long)]
    attendance: Option<PathBuf>,

    /// Practice date, YYYY-MM-DD. Defaults to today
    #[arg(long, value_parser = parse_date_arg)]
    date: Option<NaiveDate>,

    /// Practice format: knock (8 courts) or hand-knock (12 courts)
    #[arg(long, default_value = "knock")]
    practice: PracticeType,

    /// Number of groups; overrides the practice format
    #[arg(long)]
    groups: Option<usize>,

    /// Seed for reproducible tie-breaks
    #[arg(long, env = "COURT_ASSIGN_SEED")]
    seed: Option<u64>,

    /// Upper bound on rebalancing iterations
    #[arg(long, env = "COURT_ASSIGN_MAX_ITERATIONS", default_value_t = 8)]
    max_iterations: usize,

    /// Write the result grid to this CSV file
    #[arg(long)]
    out: Option<PathBuf>,

    /// Print the assignment as JSON instead of a table
    #[arg(long)]
    json: bool,
}

fn parse_date_arg(raw: &str) -> Result<NaiveDate, String> {
    attendance::parse_date(raw).ok_or_else(|| format!("invalid date '{raw}', expected YYYY-MM-DD"))
}

fn stdin_is_tty() -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::io::AsRawFd;
        unsafe { libc::isatty(io::stdin().as_raw_fd()) == 1 }
    }

    #[cfg(windows)]
    {
        use std::os::windows::io::AsRawHandle;
        let handle = io::stdin().as_raw_handle();
        let mut mode: u32 = 0;
        // GetConsoleMode returns 0 if the handle is not a console
        unsafe {
            #[link(name = "kernel32")]
            extern "system" {
                fn GetConsoleMode(hConsoleHandle: *mut std::ffi::c_void, lpMode: *mut u32) -> i32;
            }
            GetConsoleMode(handle as *mut std::ffi::c_void, &mut mode) != 0
        }
    }

    #[cfg(not(any(unix, windows)))]
    {
        true
    }
}

fn run(cli: Cli) -> Result<()> {
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    if let Err(err) = ctrlc::set_handler(move || {
        eprintln!("\nCtrl+C が押されました。現在の割り振りで確定します...");
        r.store(false, Ordering::SeqCst);
    }) {
        warn!(%err, "could not install Ctrl+C handler");
    }

    let records = match &cli.roster {
        Some(path) => roster::load_roster(path)?,
        None => {
            if stdin_is_tty() {
                bail!("部員名簿がありません: --roster を指定するか、CSV を標準入力に渡してください");
            }
            roster::read_roster(io::stdin().lock(), "stdin")?
        }
    };

    let date = cli.date.unwrap_or_else(|| Local::now().date_naive());
    let daily = match &cli.attendance {
        Some(path) => attendance::resolve(&roster::load_attendance(path)?, date),
        None => DailyStatus::default(),
    };

    let everyone = Pool::from_records(records, &daily.late).context("invalid member roster")?;
    let (absent, present): (Vec<&Participant>, Vec<&Participant>) = everyone
        .participants()
        .iter()
        .partition(|p| daily.absent.contains(&p.id));
    let pool = Pool::new(present.iter().map(|p| (*p).clone()).collect());
    info!(
        %date,
        present = pool.len(),
        absent = absent.len(),
        late = pool.participants().iter().filter(|p| p.late).count(),
        "roster loaded"
    );

    let group_count = cli.groups.unwrap_or_else(|| cli.practice.group_count());
    let config = AssignConfig {
        seed: cli.seed,
        max_iterations: cli.max_iterations,
        ..AssignConfig::default()
    };
    let assignment = partition_with_stop(&pool, group_count, &config, Some(&running));

    let title = format!("{} teams", group_count);
    let grid = format_grid(&assignment, &title, date);

    if let Some(path) = &cli.out {
        let file = File::create(path).with_context(|| format!("cannot create {}", path.display()))?;
        write_csv(&grid, file).with_context(|| format!("cannot write {}", path.display()))?;
        info!(path = %path.display(), "result grid written");
    }

    let mut stdout = io::stdout().lock();
    if cli.json {
        let absent_ids: BTreeSet<&str> = absent.iter().map(|p| p.id.as_str()).collect();
        let body = json!({
            "date": date.format("%Y-%m-%d").to_string(),
            "practice": cli.practice.as_str(),
            "groups": &assignment.groups,
            "absent": absent_ids,
            "rebalance": assignment.report,
        });
        serde_json::to_writer_pretty(&mut stdout, &body)?;
        writeln!(stdout)?;
        return Ok(());
    }

    let day = date.format("%Y-%m-%d");
    write!(
        stdout,
        "{}",
        render_table(&member_list(&format!("{} participants", day), &present))
    )?;
    write!(
        stdout,
        "{}",
        render_table(&member_list(&format!("{} absent", day), &absent))
    )?;
    writeln!(stdout)?;

    if assignment.is_empty() {
        writeln!(stdout, "参加者がいないため、割り振りは行いません。")?;
        return Ok(());
    }
    write!(stdout, "{}", render_table(&grid))?;
    writeln!(stdout)?;
    for line in summary_lines(&assignment) {
        writeln!(stdout, "{}", line)?;
    }
    if assignment.report.interrupted {
        writeln!(stdout, "(中断されたため、途中の割り振り結果です)")?;
    }
    Ok(())
}

fn main() {
    setup_logging();
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("エラー: {err:#}");
        std::process::exit(1);
    }
}
