use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LinkState {
    Online,
    Offline,
}

impl LinkState {
    pub fn label(self) -> &'static str {
        match self {
            LinkState::Online => "ONLINE",
            LinkState::Offline => "OFFLINE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkSignal {
    /// Connection to the realtime backend.
    Backend(bool),
    /// The viewer's own network connectivity.
    Browser(bool),
}

impl LinkSignal {
    fn display(self) -> ConnectionDisplay {
        let (state, reason) = match self {
            LinkSignal::Backend(true) => (LinkState::Online, "Connected to realtime backend"),
            LinkSignal::Backend(false) => (LinkState::Offline, "Disconnected from realtime backend"),
            LinkSignal::Browser(true) => (LinkState::Online, "Internet connected"),
            LinkSignal::Browser(false) => (LinkState::Offline, "No internet connection"),
        };
        ConnectionDisplay {
            state,
            reason: reason.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionDisplay {
    pub state: LinkState,
    pub reason: String,
}

/// Tracks both link signals and the badge they produce.
///
/// There is no merge policy: the most recent signal alone decides the
/// display, even when the other link disagrees.
#[derive(Debug, Clone, Default)]
pub struct ConnectionAggregator {
    backend: Option<bool>,
    browser: Option<bool>,
    current: Option<ConnectionDisplay>,
}

impl ConnectionAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, signal: LinkSignal) -> ConnectionDisplay {
        match signal {
            LinkSignal::Backend(connected) => self.backend = Some(connected),
            LinkSignal::Browser(online) => self.browser = Some(online),
        }
        let display = signal.display();
        self.current = Some(display.clone());
        display
    }

    /// Startup failure of the backend client; the reason is shown verbatim.
    pub fn backend_unavailable(&mut self, reason: impl Into<String>) -> ConnectionDisplay {
        self.backend = Some(false);
        let display = ConnectionDisplay {
            state: LinkState::Offline,
            reason: reason.into(),
        };
        self.current = Some(display.clone());
        display
    }

    pub fn current(&self) -> Option<&ConnectionDisplay> {
        self.current.as_ref()
    }

    pub fn backend_connected(&self) -> Option<bool> {
        self.backend
    }

    pub fn browser_online(&self) -> Option<bool> {
        self.browser
    }
}
