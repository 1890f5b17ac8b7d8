/*
 * Copyright (c) 2026 eps-integration-core authors
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *    http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 *
 */

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use structopt::StructOpt;
use tokio::runtime::Builder;
use url::Url;

use eps_integration_core::{
    adherence::{AdherenceCalculator, InMemoryAdherenceStore},
    audit::LogAuditSink,
    client::{spawn_sweeper, RegistryClient, ReqwestExchange, ResponseCache},
    client::{HttpTokenExchange, TokenManager},
    error::Error,
    logging::init_logger,
    misc::{create_reqwest_client, SystemClock},
    notify::LogNotificationSink,
    validation::{
        HttpModelApi, ModelApi, StaticPatientDirectory, ValidationEngine, ValidationService,
    },
};
use resources::misc::{NhsNumber, PrescriptionId};

fn main() -> Result<(), Error> {
    let opts = Options::from_args();

    init_logger(&opts.log_config)?;

    let runtime = Builder::new_multi_thread().enable_all().build()?;

    runtime.block_on(run(opts))
}

async fn run(opts: Options) -> Result<(), Error> {
    let http = create_reqwest_client().map_err(|err| Error::Generic(err.to_string()))?;
    let clock = Arc::new(SystemClock);

    let tokens = Arc::new(TokenManager::new(
        Arc::new(HttpTokenExchange::new(http.clone(), opts.token_url.clone())),
        clock.clone(),
        opts.client_id.clone(),
        opts.client_secret.clone(),
    ));

    let cache = Arc::new(ResponseCache::new(clock.clone()));
    spawn_sweeper(cache.clone(), Duration::from_secs(60));

    let audit = Arc::new(LogAuditSink);
    let notifications = Arc::new(LogNotificationSink);

    let client = Arc::new(RegistryClient::new(
        Arc::new(ReqwestExchange::new(http.clone(), opts.registry_url.clone())),
        tokens,
        cache,
        audit.clone(),
        clock.clone(),
    ));

    match opts.command {
        Command::Fetch { prescription_id } => {
            let id = PrescriptionId::new(prescription_id)?;
            let prescription = client.get_prescription(&id).await?;

            println!("{}", serde_json::to_string_pretty(&prescription)?);
        }
        Command::Validate { prescription_id } => {
            let id = PrescriptionId::new(prescription_id)?;
            let engine = ValidationEngine::new(
                client,
                Arc::new(StaticPatientDirectory::new()),
                audit,
                notifications,
                clock,
            );

            let mut service = ValidationService::new(engine);
            if let Some(model_url) = opts.model_url {
                let model: Arc<dyn ModelApi> =
                    Arc::new(HttpModelApi::new(http, model_url, opts.model_api_key));
                service = service.with_model(model).with_feedback(opts.model_feedback);
            }

            let evaluation = service.validate(&id).await?;

            println!("{}", serde_json::to_string_pretty(&evaluation.result)?);
        }
        Command::Adherence { nhs_number } => {
            let patient = NhsNumber::new(nhs_number)?;
            let calculator = AdherenceCalculator::new(
                client,
                Arc::new(InMemoryAdherenceStore::new()),
                audit,
                notifications,
                clock,
            );

            let record = calculator.calculate(&patient).await?;

            println!("{}", serde_json::to_string_pretty(&record)?);
        }
    }

    Ok(())
}

#[derive(Clone, StructOpt)]
struct Options {
    /// Base URL of the national prescribing registry.
    #[structopt(short = "r", long = "registry-url")]
    registry_url: Url,

    /// Credential exchange endpoint of the registry.
    #[structopt(short = "t", long = "token-url")]
    token_url: Url,

    #[structopt(short = "i", long = "client-id")]
    client_id: String,

    #[structopt(
        long = "client-secret",
        env = "EPS_CLIENT_SECRET",
        hide_env_values = true
    )]
    client_secret: String,

    /// Optional AI validation endpoint; rule checks run regardless.
    #[structopt(short = "m", long = "model-url")]
    model_url: Option<Url>,

    #[structopt(
        long = "model-api-key",
        env = "EPS_MODEL_API_KEY",
        hide_env_values = true
    )]
    model_api_key: Option<String>,

    #[structopt(long = "model-feedback")]
    model_feedback: bool,

    #[structopt(short = "c", long = "config", default_value = "./log4rs.yml")]
    log_config: PathBuf,

    #[structopt(subcommand)]
    command: Command,
}

#[derive(Clone, StructOpt)]
enum Command {
    /// Fetch a prescription by its identifier.
    Fetch { prescription_id: String },

    /// Run the safety checks (and the AI model when configured) against a
    /// prescription.
    Validate { prescription_id: String },

    /// Recompute the adherence snapshot of a patient.
    Adherence { nhs_number: String },
}
