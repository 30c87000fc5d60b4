use serde::Serialize;

/// Display tone a sink maps onto its own palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Neutral,
    Green,
    Yellow,
    Orange,
    Red,
    Purple,
    Rose,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AqiLevel {
    Good,
    Moderate,
    UnhealthyForSensitiveGroups,
    Unhealthy,
    VeryUnhealthy,
    Hazardous,
}

impl AqiLevel {
    pub const ALL: [AqiLevel; 6] = [
        AqiLevel::Good,
        AqiLevel::Moderate,
        AqiLevel::UnhealthyForSensitiveGroups,
        AqiLevel::Unhealthy,
        AqiLevel::VeryUnhealthy,
        AqiLevel::Hazardous,
    ];

    /// Buckets use inclusive upper bounds at 50, 100, 150, 200 and 300.
    pub fn classify(aqi: f64) -> Self {
        if aqi <= 50.0 {
            AqiLevel::Good
        } else if aqi <= 100.0 {
            AqiLevel::Moderate
        } else if aqi <= 150.0 {
            AqiLevel::UnhealthyForSensitiveGroups
        } else if aqi <= 200.0 {
            AqiLevel::Unhealthy
        } else if aqi <= 300.0 {
            AqiLevel::VeryUnhealthy
        } else {
            AqiLevel::Hazardous
        }
    }

    pub fn category(self) -> &'static str {
        match self {
            AqiLevel::Good => "Good",
            AqiLevel::Moderate => "Moderate",
            AqiLevel::UnhealthyForSensitiveGroups => "Unhealthy for Sensitive Groups",
            AqiLevel::Unhealthy => "Unhealthy",
            AqiLevel::VeryUnhealthy => "Very Unhealthy",
            AqiLevel::Hazardous => "Hazardous",
        }
    }

    pub fn badge(self) -> &'static str {
        match self {
            AqiLevel::Good => "SAFE",
            AqiLevel::Moderate => "CAUTION",
            AqiLevel::UnhealthyForSensitiveGroups => "LIMIT",
            AqiLevel::Unhealthy => "AVOID",
            AqiLevel::VeryUnhealthy => "ALERT",
            AqiLevel::Hazardous => "DANGER",
        }
    }

    pub fn tone(self) -> Tone {
        match self {
            AqiLevel::Good => Tone::Green,
            AqiLevel::Moderate => Tone::Yellow,
            AqiLevel::UnhealthyForSensitiveGroups => Tone::Orange,
            AqiLevel::Unhealthy => Tone::Red,
            AqiLevel::VeryUnhealthy => Tone::Purple,
            AqiLevel::Hazardous => Tone::Rose,
        }
    }

    pub fn tips(self) -> [&'static str; 3] {
        match self {
            AqiLevel::Good => [
                "Enjoy outdoor activities normally.",
                "Good time for walking/jogging.",
                "Open windows for ventilation if comfortable.",
            ],
            AqiLevel::Moderate => [
                "Most people can continue outdoor activities.",
                "Sensitive individuals: reduce prolonged outdoor exertion.",
                "If irritation occurs, take breaks indoors.",
            ],
            AqiLevel::UnhealthyForSensitiveGroups => [
                "Children/elderly/asthma/heart patients: limit outdoor time.",
                "Wear a well-fitted N95/KN95 mask if going outside.",
                "Keep windows closed during peak pollution hours.",
            ],
            AqiLevel::Unhealthy => [
                "Avoid outdoor exercise; stay indoors as much as possible.",
                "Use an air purifier if available.",
                "N95/KN95 recommended if you must go out.",
            ],
            AqiLevel::VeryUnhealthy => [
                "Stay indoors; keep activity levels low.",
                "Close windows/doors; avoid indoor smoke/fumes.",
                "Seek medical help if breathing issues occur.",
            ],
            AqiLevel::Hazardous => [
                "Avoid going outside unless absolutely necessary.",
                "Strict N95/KN95 + minimize exposure time if you go out.",
                "High-risk groups should follow medical advice strictly.",
            ],
        }
    }
}

pub const WAITING_TIP: &str = "Waiting for AQI data...";

/// Three-step badge shown next to the raw AQI reading. Bounds are exclusive,
/// unlike the health buckets: 50 already reads as Moderate here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompactAqiBadge {
    Good,
    Moderate,
    Unhealthy,
}

impl CompactAqiBadge {
    pub fn classify(aqi: f64) -> Self {
        if aqi < 50.0 {
            CompactAqiBadge::Good
        } else if aqi < 100.0 {
            CompactAqiBadge::Moderate
        } else {
            CompactAqiBadge::Unhealthy
        }
    }

    pub fn text(self) -> &'static str {
        match self {
            CompactAqiBadge::Good => "Good",
            CompactAqiBadge::Moderate => "Moderate",
            CompactAqiBadge::Unhealthy => "Unhealthy",
        }
    }

    pub fn tone(self) -> Tone {
        match self {
            CompactAqiBadge::Good => Tone::Green,
            CompactAqiBadge::Moderate => Tone::Yellow,
            CompactAqiBadge::Unhealthy => Tone::Red,
        }
    }
}
