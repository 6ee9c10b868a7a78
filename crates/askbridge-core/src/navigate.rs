//! Options surface navigation seam.

/// The external collaborator that owns UI navigation.
///
/// The relay delegates both the configuration-open control message and the
/// first-install event here and expects no reply. Object-safe so the
/// application layer can hold an `Arc<dyn OptionsNavigator>`.
pub trait OptionsNavigator: Send + Sync {
    /// Direct the user to the configuration surface.
    fn open_options(&self);
}
