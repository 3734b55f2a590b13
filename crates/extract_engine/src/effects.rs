use extract_core::{ChannelOp, Effect, Msg, RunFailure, RunId, SideEffect};
use extract_logging::{extract_debug, extract_warn};

use crate::{ChannelError, RemoteChannel};

/// Executes one channel-bound effect and returns the message reporting its
/// outcome, if any. Listener effects are handled by the controller.
pub(crate) async fn run_channel_effect(channel: &dyn RemoteChannel, effect: Effect) -> Option<Msg> {
    match effect {
        Effect::AttachListener { .. } => None,
        Effect::QueryUrl { run } => {
            let url = match channel.current_url().await {
                Ok(url) => url,
                Err(err) => {
                    // No page to talk to; the run declines.
                    extract_warn!("Could not read page url: {}", err);
                    String::new()
                }
            };
            Some(Msg::UrlResolved { run, url })
        }
        Effect::ReloadPage { run } => {
            extract_debug!("Reloading page before run {}", run);
            Some(completion(run, ChannelOp::Reload, channel.reload().await))
        }
        Effect::Evaluate { run, program } => {
            extract_debug!("Evaluating {:?} program for run {}", program.kind(), run);
            match channel.evaluate(&program).await {
                Ok(()) => None,
                Err(err) => Some(failed(run, ChannelOp::Evaluate, err)),
            }
        }
        Effect::Perform { run, side_effect } => Some(perform(channel, run, side_effect).await),
    }
}

async fn perform(channel: &dyn RemoteChannel, run: RunId, side_effect: SideEffect) -> Msg {
    match side_effect {
        SideEffect::GoBack => completion(run, ChannelOp::GoBack, channel.go_back().await),
        SideEffect::Navigate { url } => {
            completion(run, ChannelOp::Navigate, channel.navigate(&url).await)
        }
        SideEffect::Reload => completion(run, ChannelOp::Reload, channel.reload().await),
        SideEffect::Wait(duration) => {
            tokio::time::sleep(duration).await;
            Msg::ActionCompleted { run }
        }
        SideEffect::None => Msg::ActionCompleted { run },
    }
}

fn completion(run: RunId, op: ChannelOp, result: Result<(), ChannelError>) -> Msg {
    match result {
        Ok(()) => Msg::ActionCompleted { run },
        Err(err) => failed(run, op, err),
    }
}

fn failed(run: RunId, op: ChannelOp, err: ChannelError) -> Msg {
    Msg::ChannelFailed {
        run,
        failure: RunFailure::new(op, err.to_string()),
    }
}
