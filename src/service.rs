//! Trivia command surface
//!
//! [`Trivia`] is what a chat platform adapter calls when someone asks for a
//! game in a channel. It claims the channel in the registry, builds a
//! session from the shared collaborators and runs it to completion.

use std::{fmt::Debug, sync::Arc};

use tracing::{debug, error};

use crate::{
    chat::{ChannelId, Chat},
    config::{GameOptions, Settings},
    checker::ForgivingChecker,
    loader::JsonDirectoryLoader,
    registry::ChannelRegistry,
    session::{self, Collaborators, Report, Session},
};

/// Starts trivia games on request
///
/// Clones share the registry and collaborators, so a clone can be moved into
/// each task that handles a channel.
#[derive(Clone)]
pub struct Trivia {
    registry: ChannelRegistry,
    collaborators: Collaborators,
    options: GameOptions,
}

impl Debug for Trivia {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Trivia")
            .field("registry", &self.registry)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Trivia {
    /// Creates a service from its parts
    pub fn new(
        registry: ChannelRegistry,
        collaborators: Collaborators,
        options: GameOptions,
    ) -> Self {
        Self {
            registry,
            collaborators,
            options,
        }
    }

    /// Creates a service reading questions from the settings' directory
    pub fn from_settings(settings: &Settings, chat: Arc<dyn Chat>) -> Self {
        Self::new(
            ChannelRegistry::new(settings.allowed_channels.iter().copied()),
            Collaborators {
                chat,
                loader: Arc::new(JsonDirectoryLoader::new(&settings.questions_dir)),
                checker: Arc::new(ForgivingChecker),
            },
            settings.game.clone(),
        )
    }

    /// The record of running games
    pub fn registry(&self) -> &ChannelRegistry {
        &self.registry
    }

    /// Options applied to every game
    pub fn options(&self) -> &GameOptions {
        &self.options
    }

    /// Runs a game in `channel`
    ///
    /// Returns `Ok(None)` without posting anything if games are not allowed
    /// in the channel or one is already running there. The channel is free
    /// again once this returns.
    ///
    /// # Errors
    ///
    /// Returns the [`session::Error`] that ended the game. It is logged but
    /// not posted to the channel.
    #[tracing::instrument(skip(self))]
    pub async fn start(&self, channel: ChannelId) -> Result<Option<Report>, session::Error> {
        let registration = self.registry.try_start(channel, |id| {
            Session::new(id, channel, self.collaborators.clone(), self.options.clone())
        });

        let mut registration = match registration {
            Ok(registration) => registration,
            Err(refusal) => {
                debug!(%refusal, "start ignored");
                return Ok(None);
            }
        };

        match registration.start().await {
            Ok(report) => Ok(Some(report)),
            Err(error) => {
                error!(%error, session = %registration.id(), "trivia game failed");
                Err(error)
            }
        }
    }
}
