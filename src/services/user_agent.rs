//! User agent classification into fixed browser and device buckets
//!
//! Order matters in both classifiers:
//! - Edge UAs also contain `Chrome` and `Safari`, so Edge is checked first;
//!   Chrome UAs contain `Safari`, so Chrome precedes Safari.
//! - Tablet UAs frequently match mobile patterns too, so tablets are
//!   checked before phones.
//!
//! A missing or empty user agent classifies as `Other` / `Desktop`.

use serde::Serialize;
use strum::{AsRefStr, Display};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, AsRefStr, Display, Serialize,
)]
pub enum Browser {
    Chrome,
    Safari,
    Firefox,
    Edge,
    Other,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, AsRefStr, Display, Serialize,
)]
pub enum Device {
    Mobile,
    Desktop,
    Tablet,
}

const EDGE_PATTERNS: &[&str] = &["edg/", "edge/", "edga/", "edgios/"];
const FIREFOX_PATTERNS: &[&str] = &["firefox/", "fxios/"];
const CHROME_PATTERNS: &[&str] = &["chrome/", "crios/", "chromium/"];
const SAFARI_PATTERNS: &[&str] = &["safari/"];

const TABLET_PATTERNS: &[&str] = &["ipad", "tablet", "kindle", "silk/", "playbook", "nexus 7", "nexus 9"];
const MOBILE_PATTERNS: &[&str] = &[
    "mobile",
    "iphone",
    "ipod",
    "android",
    "windows phone",
    "blackberry",
    "opera mini",
    "iemobile",
];

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

pub fn classify_browser(user_agent: &str) -> Browser {
    let ua = user_agent.to_ascii_lowercase();
    if contains_any(&ua, EDGE_PATTERNS) {
        Browser::Edge
    } else if contains_any(&ua, FIREFOX_PATTERNS) {
        Browser::Firefox
    } else if contains_any(&ua, CHROME_PATTERNS) {
        Browser::Chrome
    } else if contains_any(&ua, SAFARI_PATTERNS) {
        Browser::Safari
    } else {
        Browser::Other
    }
}

pub fn classify_device(user_agent: &str) -> Device {
    let ua = user_agent.to_ascii_lowercase();
    // Android tablets omit "Mobile"
    let android_tablet = ua.contains("android") && !ua.contains("mobile");
    if android_tablet || contains_any(&ua, TABLET_PATTERNS) {
        Device::Tablet
    } else if contains_any(&ua, MOBILE_PATTERNS) {
        Device::Mobile
    } else {
        Device::Desktop
    }
}

/// Both classifications at once
pub fn classify(user_agent: Option<&str>) -> (Browser, Device) {
    match user_agent.map(str::trim).filter(|ua| !ua.is_empty()) {
        Some(ua) => (classify_browser(ua), classify_device(ua)),
        None => (Browser::Other, Device::Desktop),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHROME_WIN: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
    const EDGE_WIN: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 Edg/120.0.2210.91";
    const SAFARI_IPHONE: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_2 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Mobile/15E148 Safari/604.1";
    const SAFARI_IPAD: &str = "Mozilla/5.0 (iPad; CPU OS 17_2 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Mobile/15E148 Safari/604.1";
    const FIREFOX_LINUX: &str = "Mozilla/5.0 (X11; Linux x86_64; rv:121.0) Gecko/20100101 Firefox/121.0";
    const CHROME_ANDROID_PHONE: &str = "Mozilla/5.0 (Linux; Android 14; Pixel 8) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.6099.144 Mobile Safari/537.36";
    const CHROME_ANDROID_TABLET: &str = "Mozilla/5.0 (Linux; Android 13; SM-X710) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.6099.144 Safari/537.36";
    const CHROME_IOS: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_2 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) CriOS/120.0.6099.119 Mobile/15E148 Safari/604.1";

    #[test]
    fn edge_wins_over_chrome_and_safari() {
        assert_eq!(classify_browser(EDGE_WIN), Browser::Edge);
        assert_eq!(classify_browser(CHROME_WIN), Browser::Chrome);
    }

    #[test]
    fn browsers() {
        assert_eq!(classify_browser(SAFARI_IPHONE), Browser::Safari);
        assert_eq!(classify_browser(FIREFOX_LINUX), Browser::Firefox);
        assert_eq!(classify_browser(CHROME_IOS), Browser::Chrome);
        assert_eq!(classify_browser("curl/8.4.0"), Browser::Other);
    }

    #[test]
    fn tablet_checked_before_mobile() {
        assert_eq!(classify_device(SAFARI_IPAD), Device::Tablet);
        assert_eq!(classify_device(CHROME_ANDROID_TABLET), Device::Tablet);
        assert_eq!(classify_device(CHROME_ANDROID_PHONE), Device::Mobile);
        assert_eq!(classify_device(SAFARI_IPHONE), Device::Mobile);
    }

    #[test]
    fn desktop_is_the_fallback() {
        assert_eq!(classify_device(CHROME_WIN), Device::Desktop);
        assert_eq!(classify_device(FIREFOX_LINUX), Device::Desktop);
    }

    #[test]
    fn missing_user_agent() {
        assert_eq!(classify(None), (Browser::Other, Device::Desktop));
        assert_eq!(classify(Some("   ")), (Browser::Other, Device::Desktop));
        assert_eq!(classify(Some(EDGE_WIN)), (Browser::Edge, Device::Desktop));
    }
}
