//!
//! fundgate CLI binary
//! -------------------
//! Small walkthrough client for the identity core: logs in with a demo role
//! (or a simulated wallet), prints the derived identity, permissions and
//! gate decisions, then logs out. Useful for poking at a local backend or
//! demonstrating offline fallback behavior.

use std::env;
use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use fundgate::config::Config;
use fundgate::identity::{AccessPolicy, AuthManager, AuthMethod, FileKv, SimulatedWallet};

fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {program} --demo <role>        # demo login for a role (vendor, citizen, main_government, ...)\n  {program} --wallet <principal> # simulated wallet login for a principal string\n  {program} --status             # restore a persisted session and print it\n  {program} -h | --help\n\nEnvironment:\n  FUNDGATE_API_URL       backend base URL (default http://localhost:8000/api/v1)\n  FUNDGATE_REFRESH_SECS  refresh cadence in seconds (default 3600)\n  FUNDGATE_DATA_DIR      session storage directory (default fundgate_data)"
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    // Init logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    fmt().with_env_filter(filter).init();

    let cfg = Config::from_env();
    info!(
        target: "fundgate",
        "fundgate starting: api='{}', refresh_secs={}, data_dir='{}'",
        cfg.api_base,
        cfg.refresh_interval.as_secs(),
        cfg.storage_dir.display()
    );

    let args: Vec<String> = env::args().collect();
    let program = args.first().map(|s| s.as_str()).unwrap_or("fundgate_cli").to_string();

    let mut method: Option<AuthMethod> = None;
    let mut status_only = false;
    let mut wallet_principal = "local-wallet-principal".to_string();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--demo" => {
                i += 1;
                let role = args.get(i).cloned().unwrap_or_else(|| "vendor".to_string());
                method = Some(AuthMethod::Demo { role });
            }
            "--wallet" => {
                i += 1;
                if let Some(p) = args.get(i) {
                    wallet_principal = p.clone();
                }
                method = Some(AuthMethod::Wallet);
            }
            "--status" => status_only = true,
            "-h" | "--help" => {
                print_usage(&program);
                return Ok(());
            }
            other => {
                eprintln!("unknown argument: {}", other);
                print_usage(&program);
                return Ok(());
            }
        }
        i += 1;
    }

    let kv = Arc::new(FileKv::new(&cfg.storage_dir)?);
    let wallet = Box::new(SimulatedWallet::new(wallet_principal));
    let manager = AuthManager::new(cfg, kv, wallet);
    manager.init().await;

    if status_only {
        match manager.current_identity() {
            Some(id) => println!(
                "session: {} ({}), role={}, permissions=[{}]",
                id.display_name,
                id.subject_id,
                id.role,
                id.permissions.join(", ")
            ),
            None => println!("no session"),
        }
        return Ok(());
    }

    let method = method.unwrap_or(AuthMethod::Demo { role: "vendor".to_string() });
    let identity = manager.login(method).await?;
    println!("logged in: {} ({})", identity.display_name, identity.title);
    println!("  subject:     {}", identity.subject_id);
    println!("  role:        {}", identity.role);
    println!("  permissions: [{}]", identity.permissions.join(", "));

    let gates = [
        ("admin surface", AccessPolicy::roles(["main_government"])),
        ("claim submission", AccessPolicy::permissions(["claim_submission"])),
        (
            "citizen reporting",
            AccessPolicy::permissions(["transparency_access", "corruption_reporting"]).require_all(),
        ),
    ];
    for (label, policy) in &gates {
        let d = manager.check_access(policy);
        if d.allowed {
            println!("  gate '{}': allowed", label);
        } else {
            println!("  gate '{}': denied ({})", label, d.message());
        }
    }

    if let Some(ops) = manager.platform_ops() {
        let names: Vec<&str> = ops.available().iter().map(|o| o.as_str()).collect();
        println!("  operations:  [{}]", names.join(", "));
    }

    manager.logout().await;
    println!("logged out; session store cleared");
    Ok(())
}
