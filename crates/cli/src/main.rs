use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use data_loader::CsvTransactionSource;
use model_store::{InMemoryModelStore, RankingEntry};
use server::{
    FallbackAnswer, HttpApi, HttpState, JsonlQueryLog, QueryLog, RecentResults,
    ResolutionStrategy, Resolver, TcpIngress,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use trainer::Trainer;
use worker_client::{QueryFrame, WorkerEndpoint, WorkerPoolClient};

/// CompraRecs - Procurement Entity Recommendation Service
#[derive(Parser)]
#[command(name = "compra-recs")]
#[command(about = "Entity-ranking recommendations for framework-agreement purchases", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum StrategyArg {
    /// Answer from the local model store only
    Local,
    /// Local store first, then the configured worker pool
    Delegate,
    /// Always answer the configured default (smoke tests)
    Static,
}

impl From<StrategyArg> for ResolutionStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Local => ResolutionStrategy::LocalOnly,
            StrategyArg::Delegate => ResolutionStrategy::DelegateToWorkers,
            StrategyArg::Static => ResolutionStrategy::StaticDefault,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum FallbackArg {
    /// Fixed low-confidence institution list
    Institutions,
    /// Single {"ERROR", 0.0} sentinel entry
    Sentinel,
}

impl From<FallbackArg> for FallbackAnswer {
    fn from(arg: FallbackArg) -> Self {
        match arg {
            FallbackArg::Institutions => FallbackAnswer::institutions(),
            FallbackArg::Sentinel => FallbackAnswer::sentinel(),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run the main node: periodic trainer, TCP ingress and HTTP API
    Serve {
        /// Path to the purchase-order CSV report
        #[arg(long, default_value = "data/ReportePCBienes_cleaned.csv")]
        data: PathBuf,

        /// TCP query port
        #[arg(long, default_value = "8000")]
        tcp_port: u16,

        /// HTTP API port
        #[arg(long, default_value = "8080")]
        http_port: u16,

        /// Query log file (JSON lines)
        #[arg(long, default_value = "data/consultas.jsonl")]
        query_log: PathBuf,

        /// Worker endpoint, repeatable; order defines failover priority
        #[arg(long = "worker")]
        workers: Vec<String>,

        /// Resolution strategy for this node
        #[arg(long, value_enum, default_value = "local")]
        strategy: StrategyArg,

        /// Terminal default answer when nothing else resolves
        #[arg(long, value_enum, default_value = "institutions")]
        fallback: FallbackArg,

        /// Minutes between training passes
        #[arg(long, default_value = "30")]
        train_interval_mins: u64,
    },

    /// Run a worker node: periodic trainer and TCP ingress over its own
    /// model copy
    Worker {
        /// Path to this worker's copy of the purchase-order CSV report
        #[arg(long, default_value = "data/ReportePCBienes_cleaned.csv")]
        data: PathBuf,

        /// TCP query port
        #[arg(long, default_value = "8001")]
        tcp_port: u16,

        /// Query log file (JSON lines)
        #[arg(long, default_value = "data/consultas-worker.jsonl")]
        query_log: PathBuf,

        /// Terminal default answer when nothing else resolves
        #[arg(long, value_enum, default_value = "sentinel")]
        fallback: FallbackArg,

        /// Minutes between training passes
        #[arg(long, default_value = "30")]
        train_interval_mins: u64,
    },

    /// Run one training pass and print the report
    Train {
        /// Path to the purchase-order CSV report
        #[arg(long, default_value = "data/ReportePCBienes_cleaned.csv")]
        data: PathBuf,
    },

    /// Send one query to a node over TCP and print the ranking
    Query {
        /// Node address
        #[arg(long, default_value = "127.0.0.1:8000")]
        addr: String,

        /// Product name to look up
        #[arg(long)]
        producto: String,
    },

    /// Fire concurrent TCP queries at a node and report latencies
    Bench {
        /// Node address
        #[arg(long, default_value = "127.0.0.1:8000")]
        addr: String,

        /// Number of requests to make
        #[arg(long, default_value = "100")]
        requests: usize,

        /// Number of concurrent requests
        #[arg(long, default_value = "10")]
        concurrent: usize,

        /// Product name to draw from at random, repeatable
        #[arg(long = "producto")]
        productos: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            data,
            tcp_port,
            http_port,
            query_log,
            workers,
            strategy,
            fallback,
            train_interval_mins,
        } => {
            handle_serve(
                data,
                tcp_port,
                http_port,
                query_log,
                workers,
                strategy.into(),
                fallback.into(),
                Duration::from_secs(train_interval_mins * 60),
            )
            .await?
        }
        Commands::Worker {
            data,
            tcp_port,
            query_log,
            fallback,
            train_interval_mins,
        } => {
            handle_worker(
                data,
                tcp_port,
                query_log,
                fallback.into(),
                Duration::from_secs(train_interval_mins * 60),
            )
            .await?
        }
        Commands::Train { data } => handle_train(data).await?,
        Commands::Query { addr, producto } => handle_query(addr, producto).await?,
        Commands::Bench {
            addr,
            requests,
            concurrent,
            productos,
        } => handle_bench(addr, requests, concurrent, productos).await?,
    }

    Ok(())
}

/// Handle the 'serve' command: the full main node
#[allow(clippy::too_many_arguments)]
async fn handle_serve(
    data: PathBuf,
    tcp_port: u16,
    http_port: u16,
    query_log_path: PathBuf,
    workers: Vec<String>,
    strategy: ResolutionStrategy,
    fallback: FallbackAnswer,
    train_interval: Duration,
) -> Result<()> {
    let store = Arc::new(InMemoryModelStore::new());
    let recent = Arc::new(RecentResults::new());
    let query_log: Arc<dyn QueryLog> = Arc::new(JsonlQueryLog::new(&query_log_path));

    // Periodic trainer: first pass runs immediately
    let trainer = Trainer::new(
        Arc::new(CsvTransactionSource::new(&data)),
        store.clone(),
    );
    tokio::spawn(async move { trainer.run_periodic(train_interval).await });

    let mut resolver = Resolver::new(store, strategy, fallback).with_recent(recent.clone());
    if !workers.is_empty() {
        let endpoints: Vec<WorkerEndpoint> =
            workers.into_iter().map(WorkerEndpoint::new).collect();
        resolver = resolver.with_workers(WorkerPoolClient::new(endpoints));
    }

    // Failing to acquire a listening socket is the one fatal startup error
    let listener = TcpListener::bind(("0.0.0.0", tcp_port))
        .await
        .with_context(|| format!("Failed to bind TCP port {}", tcp_port))?;
    let tcp = Arc::new(TcpIngress::new(resolver.clone(), query_log.clone()));
    tokio::spawn(async move { tcp.serve(listener).await });

    let state = HttpState {
        resolver,
        query_log,
        dataset_path: data,
        recent,
    };
    HttpApi::start(state, http_port)
        .await
        .with_context(|| format!("Failed to serve HTTP API on port {}", http_port))?;

    Ok(())
}

/// Handle the 'worker' command: TCP-only node over its own model copy
async fn handle_worker(
    data: PathBuf,
    tcp_port: u16,
    query_log_path: PathBuf,
    fallback: FallbackAnswer,
    train_interval: Duration,
) -> Result<()> {
    let store = Arc::new(InMemoryModelStore::new());
    let query_log: Arc<dyn QueryLog> = Arc::new(JsonlQueryLog::new(&query_log_path));

    let trainer = Trainer::new(Arc::new(CsvTransactionSource::new(&data)), store.clone());
    tokio::spawn(async move { trainer.run_periodic(train_interval).await });

    let resolver = Resolver::new(store, ResolutionStrategy::LocalOnly, fallback);

    let listener = TcpListener::bind(("0.0.0.0", tcp_port))
        .await
        .with_context(|| format!("Failed to bind TCP port {}", tcp_port))?;
    let tcp = Arc::new(TcpIngress::new(resolver, query_log));
    tcp.serve(listener).await;

    Ok(())
}

/// Handle the 'train' command
async fn handle_train(data: PathBuf) -> Result<()> {
    let store = Arc::new(InMemoryModelStore::new());
    let trainer = Trainer::new(Arc::new(CsvTransactionSource::new(&data)), store);

    let start = Instant::now();
    let report = trainer
        .train_once()
        .await
        .context("Training pass failed")?;

    println!(
        "{} Trained {} products from {} records ({} skipped) in {:?}",
        "✓".green(),
        report.products_trained,
        report.records_used,
        report.records_skipped,
        start.elapsed()
    );
    Ok(())
}

/// Handle the 'query' command
async fn handle_query(addr: String, producto: String) -> Result<()> {
    let start = Instant::now();
    let resultados = send_query(&addr, &producto).await?;

    println!(
        "{}",
        format!("Ranking for '{}':", producto).bold().blue()
    );
    for (i, entry) in resultados.iter().enumerate() {
        println!(
            "{}. {} - Score: {:.2}",
            (i + 1).to_string().green(),
            entry.entidad,
            entry.score
        );
    }
    println!("({} entries in {:?})", resultados.len(), start.elapsed());
    Ok(())
}

/// Handle the 'bench' command
async fn handle_bench(
    addr: String,
    requests: usize,
    concurrent: usize,
    mut productos: Vec<String>,
) -> Result<()> {
    if productos.is_empty() {
        productos = vec![
            "COMPUTADORAS PORTÁTILES".to_string(),
            "PAPEL BOND A4".to_string(),
            "ÚTILES DE OFICINA".to_string(),
        ];
    }

    let semaphore = Arc::new(tokio::sync::Semaphore::new(concurrent.max(1)));
    let mut handles = vec![];
    for _ in 0..requests {
        let producto = productos[rand::random::<u32>() as usize % productos.len()].clone();
        let addr = addr.clone();
        let semaphore = semaphore.clone();
        let handle = tokio::spawn(async move {
            let _permit = semaphore.acquire_owned().await?;
            let start = Instant::now();
            send_query(&addr, &producto).await?;
            Ok::<_, anyhow::Error>(start.elapsed())
        });
        handles.push(handle);
    }

    // Wait for all tasks to complete and collect timings
    let mut timings = vec![];
    for handle in handles {
        let elapsed = handle.await??;
        timings.push(elapsed);
    }

    let total_time: Duration = timings.iter().sum();
    let avg_latency = total_time / (timings.len() as u32);
    timings.sort();
    let p50 = timings[timings.len() / 2];
    let p95 = timings[(timings.len() as f32 * 0.95) as usize];
    let p99 = timings[(timings.len() as f32 * 0.99) as usize];
    let throughput = requests as f32 / total_time.as_secs_f32();

    println!("Benchmark results:");
    println!("Total time: {:?}", total_time);
    println!("Average latency: {:?}", avg_latency);
    println!("P50 latency: {:?}", p50);
    println!("P95 latency: {:?}", p95);
    println!("P99 latency: {:?}", p99);
    println!("Throughput: {:.2} requests/second", throughput);

    Ok(())
}

/// One query frame over a fresh TCP connection.
async fn send_query(addr: &str, producto: &str) -> Result<Vec<RankingEntry>> {
    let mut stream = TcpStream::connect(addr)
        .await
        .with_context(|| format!("Failed to connect to {}", addr))?;

    let frame = serde_json::to_string(&QueryFrame::new(producto))?;
    stream.write_all(frame.as_bytes()).await?;
    stream.write_all(b"\n").await?;

    let mut lines = BufReader::new(stream).lines();
    let line = lines
        .next_line()
        .await?
        .context("Connection closed before a response frame arrived")?;

    serde_json::from_str(line.trim()).context("Invalid response frame")
}
