//! Browser fingerprint for platform requests
//!
//! The web player endpoints expect a desktop Chrome. Profiles vary the OS and
//! Chrome build so repeated runs do not all look identical.

use rand::seq::SliceRandom;
use rand::Rng;
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_ENCODING, ACCEPT_LANGUAGE, USER_AGENT,
};

/// Browser profile with realistic fingerprint
#[derive(Debug, Clone)]
pub struct BrowserProfile {
    pub user_agent: String,
    pub accept: String,
    pub accept_language: String,
    pub accept_encoding: String,
    pub sec_ch_ua: String,
    pub sec_ch_ua_mobile: String,
    pub sec_ch_ua_platform: String,
    pub sec_fetch_dest: String,
    pub sec_fetch_mode: String,
    pub sec_fetch_site: String,
}

/// Chrome builds the player is known to accept
const CHROME_VERSIONS: &[(&str, &str)] = &[
    ("131", "131.0.0.0"),
    ("130", "130.0.0.0"),
    ("129", "129.0.0.0"),
    ("128", "128.0.0.0"),
];

/// The platform serves mainland audiences; keep zh first.
const ACCEPT_LANGUAGES: &[&str] = &[
    "zh-CN,zh;q=0.9",
    "zh-CN,zh;q=0.9,en;q=0.8",
    "zh-CN,zh-TW;q=0.9,zh;q=0.8,en;q=0.7",
];

/// Desktop platforms
#[derive(Debug, Clone, Copy)]
pub enum Platform {
    MacOS,
    Windows,
}

impl Platform {
    fn random() -> Self {
        let mut rng = rand::thread_rng();
        // Windows dominates the platform's desktop traffic
        let roll: f32 = rng.gen();
        if roll < 0.8 {
            Platform::Windows
        } else {
            Platform::MacOS
        }
    }

    fn os_string(self) -> &'static str {
        match self {
            Platform::MacOS => "Macintosh; Intel Mac OS X 10_15_7",
            Platform::Windows => "Windows NT 10.0; Win64; x64",
        }
    }

    fn sec_ch_platform(self) -> &'static str {
        match self {
            Platform::MacOS => "\"macOS\"",
            Platform::Windows => "\"Windows\"",
        }
    }
}

/// Generate a desktop Chrome profile
#[must_use]
pub fn chrome_profile() -> BrowserProfile {
    let mut rng = rand::thread_rng();
    let platform = Platform::random();
    let (major, full) = CHROME_VERSIONS
        .choose(&mut rng)
        .copied()
        .unwrap_or(CHROME_VERSIONS[0]);

    let user_agent = format!(
        "Mozilla/5.0 ({}) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/{full} Safari/537.36",
        platform.os_string()
    );

    let brands = [
        format!("\"Google Chrome\";v=\"{major}\""),
        format!("\"Chromium\";v=\"{major}\""),
        "\"Not_A Brand\";v=\"24\"".to_string(),
    ];

    BrowserProfile {
        user_agent,
        accept: "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8".to_string(),
        accept_language: (*ACCEPT_LANGUAGES.choose(&mut rng).unwrap_or(&ACCEPT_LANGUAGES[0])).to_string(),
        accept_encoding: "gzip, deflate, br, zstd".to_string(),
        sec_ch_ua: brands.join(", "),
        sec_ch_ua_mobile: "?0".to_string(),
        sec_ch_ua_platform: platform.sec_ch_platform().to_string(),
        sec_fetch_dest: "document".to_string(),
        sec_fetch_mode: "navigate".to_string(),
        sec_fetch_site: "none".to_string(),
    }
}

impl BrowserProfile {
    /// Replace the User-Agent, keeping every other header.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: &str) -> Self {
        self.user_agent = user_agent.to_string();
        self
    }

    /// Convert profile to reqwest `HeaderMap`
    ///
    /// Values that are not valid header text are left out.
    pub fn to_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();

        let pairs: [(HeaderName, &str); 4] = [
            (USER_AGENT, &self.user_agent),
            (ACCEPT, &self.accept),
            (ACCEPT_LANGUAGE, &self.accept_language),
            (ACCEPT_ENCODING, &self.accept_encoding),
        ];
        for (name, value) in pairs {
            if let Ok(value) = HeaderValue::from_str(value) {
                headers.insert(name, value);
            }
        }

        let extra = [
            ("sec-ch-ua", &self.sec_ch_ua),
            ("sec-ch-ua-mobile", &self.sec_ch_ua_mobile),
            ("sec-ch-ua-platform", &self.sec_ch_ua_platform),
            ("sec-fetch-dest", &self.sec_fetch_dest),
            ("sec-fetch-mode", &self.sec_fetch_mode),
            ("sec-fetch-site", &self.sec_fetch_site),
        ];
        for (name, value) in extra {
            if value.is_empty() {
                continue;
            }
            if let Ok(value) = HeaderValue::from_str(value) {
                headers.insert(HeaderName::from_static(name), value);
            }
        }

        headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chrome_profile_is_desktop_chrome() {
        for _ in 0..20 {
            let profile = chrome_profile();
            assert!(profile.user_agent.contains("Chrome/"));
            assert!(!profile.user_agent.contains("Mobile"));
            assert!(profile.accept_language.starts_with("zh-CN"));
            assert!(profile.sec_ch_ua.contains("Chromium"));
        }
    }

    #[test]
    fn headers_carry_profile_values() {
        let profile = chrome_profile().with_user_agent("TestAgent/1.0");
        let headers = profile.to_headers();
        assert_eq!(headers.get(USER_AGENT).unwrap(), "TestAgent/1.0");
        assert!(headers.contains_key("sec-ch-ua-platform"));
        assert!(headers.contains_key(ACCEPT_ENCODING));
    }

    #[test]
    fn invalid_header_text_is_skipped() {
        let profile = chrome_profile().with_user_agent("bad\nagent");
        let headers = profile.to_headers();
        assert!(headers.get(USER_AGENT).is_none());
        assert!(headers.get(ACCEPT).is_some());
    }
}
