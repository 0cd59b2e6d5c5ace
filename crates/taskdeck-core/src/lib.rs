pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod controller;
pub mod editor;
pub mod filter;
pub mod render;
pub mod session;

use std::ffi::OsString;

use anyhow::Context;
use clap::Parser;
use tracing::{
  debug,
  info
};

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let pre =
    cli::preprocess_args(&raw_args)?;
  let cli = cli::GlobalCli::parse_from(
    pre.cleaned_args
  );

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting taskdeck"
  );
  debug!(?pre.rc_overrides, "preprocessed rc overrides");

  let mut cfg = config::Config::load(
    cli.config.as_deref()
  )?;
  cfg.apply_overrides(
    pre.rc_overrides.into_iter().chain(
      cli
        .rc_overrides
        .into_iter()
        .map(|kv| (kv.key, kv.value))
    )
  );
  if let Some(url) = cli.api_url {
    cfg.apply_overrides([(
      "api.base_url".to_string(),
      url
    )]);
  }

  let data_dir =
    config::resolve_data_dir(
      &cfg,
      cli.data.as_deref()
    )
    .context(
      "failed to resolve data \
       directory"
    )?;

  let mut session =
    session::FileSession::open(
      &data_dir
    )
    .with_context(|| {
      format!(
        "failed to open session store \
         at {}",
        data_dir.display()
      )
    })?;

  let command = cli.command.unwrap_or(
    cli::Command::List(
      cli::ListArgs::default()
    )
  );

  // Login and logout need only the
  // session store.
  let Some(command) =
    commands::dispatch_local(
      &mut session,
      command
    )?
  else {
    info!("done");
    return Ok(());
  };

  let token =
    session::access_token(&session)?;
  let api = api::HttpTaskApi::new(
    &cfg.base_url(),
    cfg.timeout()?,
    token
  )?;
  let mut controller =
    controller::TaskListController::new(
      api
    );

  let renderer =
    render::Renderer::new(&cfg)?;

  let runtime =
    tokio::runtime::Builder::new_current_thread()
      .enable_all()
      .build()
      .context(
        "failed to start async runtime"
      )?;

  runtime.block_on(commands::dispatch(
    &mut controller,
    &mut session,
    &cfg,
    &renderer,
    command
  ))?;

  info!("done");
  Ok(())
}
