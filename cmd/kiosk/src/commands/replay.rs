//! Session replay command.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Args;
use kiosk_attendance::{Config, Failure, IdentityDirectory, Kiosk, KioskError, MemoryLedger, NAME_KEY};
use kiosk_bitindex::Metadata;
use serde_json::{json, Value};
use tracing::info;

use super::session::{Input, Session, Step};
use crate::Cli;

#[derive(Args)]
pub struct ReplayCommand {
    /// Session file (YAML)
    session: PathBuf,

    /// Stop at the first failed step
    #[arg(long)]
    fail_fast: bool,
}

impl ReplayCommand {
    pub async fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let cfg = Config::load(cli.config.as_deref())?;
        let session = Session::load(&self.session)?;
        let base = self
            .session
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        let ledger = Arc::new(MemoryLedger::new());
        let kiosk = Kiosk::from_config(&cfg, ledger.clone())?;
        info!(
            steps = session.steps.len(),
            bits = kiosk.config().bits,
            strategy = kiosk.strategy_name(),
            kernel = kiosk.index().kernel_name(),
            "kiosk: replaying session"
        );

        let mut failed = 0;
        for (i, step) in session.steps.iter().enumerate() {
            let line = match run_step(&kiosk, step, &base).await {
                Ok(result) => json!({ "step": i, "op": step.op(), "result": result }),
                Err(e) => {
                    failed += 1;
                    let failure = match e.downcast_ref::<KioskError>() {
                        Some(ke) => ke.to_failure(),
                        None => Failure {
                            kind: "invalid_input".into(),
                            message: e.to_string(),
                        },
                    };
                    json!({ "step": i, "op": step.op(), "error": failure })
                }
            };
            println!("{}", serde_json::to_string(&line)?);
            if failed > 0 && self.fail_fast {
                break;
            }
        }

        println!(
            "{}",
            serde_json::to_string(&json!({
                "summary": {
                    "steps": session.steps.len(),
                    "failed": failed,
                    "enrolled": kiosk.index().len(),
                    "ledger_entries": ledger.len(),
                }
            }))?
        );
        if failed > 0 && self.fail_fast {
            anyhow::bail!("step failed");
        }
        Ok(())
    }
}

async fn run_step(kiosk: &Kiosk, step: &Step, base: &Path) -> anyhow::Result<Value> {
    let value = match step {
        Step::Enroll(e) => {
            let mut metadata: Metadata = e.metadata.clone();
            if let Some(name) = &e.name {
                metadata.insert(NAME_KEY.to_string(), name.clone());
            }
            let record = match e.probe().input(base)? {
                Input::Signature(sig) => kiosk.enroll_signature(&e.id, &sig, metadata)?,
                Input::Image(img) => kiosk.enroll(&e.id, &img, metadata).await?,
            };
            json!({ "id": record.id, "vector": record.vector.to_hex() })
        }
        Step::CheckIn(p) => {
            let c = match p.input(base)? {
                Input::Signature(sig) => kiosk.check_in_signature(&sig).await?,
                Input::Image(img) => kiosk.check_in(&img).await?,
            };
            serde_json::to_value(c)?
        }
        Step::Recognize(p) => {
            let r = match p.input(base)? {
                Input::Signature(sig) => kiosk.recognize_signature(&sig)?,
                Input::Image(img) => kiosk.recognize(&img).await?,
            };
            serde_json::to_value(r)?
        }
        Step::Remove(id) => json!({ "id": id, "removed": kiosk.remove(id) }),
        Step::List => serde_json::to_value(kiosk.directory().list().await?)?,
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use kiosk_attendance::MatchConfig;
    use kiosk_bitindex::BitIndex;

    use super::*;

    fn kiosk() -> Kiosk {
        let cfg = MatchConfig {
            bits: 16,
            ..MatchConfig::default()
        };
        Kiosk::new(
            Arc::new(BitIndex::scalar(16).unwrap()),
            Arc::new(MemoryLedger::new()),
            cfg,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn replays_steps() {
        let session: Session = serde_yaml::from_str(
            r#"
steps:
  - enroll: { id: a, name: Ada, signature: { hash: "ff00" } }
  - check_in: { signature: { hash: "fe00" } }
  - check_in: { signature: { hash: "fe00" } }
  - list
"#,
        )
        .unwrap();
        let k = kiosk();
        let base = Path::new(".");

        let out = run_step(&k, &session.steps[0], base).await.unwrap();
        assert_eq!(out["vector"], "ff00");

        let first = run_step(&k, &session.steps[1], base).await.unwrap();
        assert_eq!(first["action"], "clock_in");
        assert_eq!(first["decision"]["distance"], 1);
        let second = run_step(&k, &session.steps[2], base).await.unwrap();
        assert_eq!(second["action"], "clock_out");

        let list = run_step(&k, &session.steps[3], base).await.unwrap();
        assert_eq!(list[0]["display_name"], "Ada");
    }

    #[tokio::test]
    async fn image_without_generator_is_a_config_failure() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("p.jpg"), b"jpeg").unwrap();
        let session: Session =
            serde_yaml::from_str("steps:\n  - recognize: { image: p.jpg }\n").unwrap();

        let err = run_step(&kiosk(), &session.steps[0], dir.path())
            .await
            .unwrap_err();
        let ke = err.downcast_ref::<KioskError>().unwrap();
        assert_eq!(ke.kind(), "config");
    }
}
