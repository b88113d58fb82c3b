use crate::UrlError;
use std::fmt;
use std::str::FromStr;

/// A city whose sold listings can be crawled
///
/// The site addresses a city by a URL slug and a numeric area id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum City {
    Stockholm,
    Linkoping,
}

impl City {
    /// Every supported city, in declaration order
    pub const ALL: [City; 2] = [City::Stockholm, City::Linkoping];

    /// Numeric area id used in index URLs
    pub fn area_id(&self) -> u32 {
        match self {
            Self::Stockholm => 1,
            Self::Linkoping => 393,
        }
    }

    /// Lowercase ASCII slug used in index URLs and cache file names
    pub fn slug(&self) -> &'static str {
        match self {
            Self::Stockholm => "stockholm",
            Self::Linkoping => "linkoping",
        }
    }

    /// Human readable name
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Stockholm => "Stockholm",
            Self::Linkoping => "Linköping",
        }
    }

    /// Looks a city up by its area id
    pub fn from_area_id(id: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|city| city.area_id() == id)
    }
}

impl fmt::Display for City {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl FromStr for City {
    type Err = UrlError;

    /// Accepts the slug, the display name or the area id, case-insensitively
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();

        if let Ok(id) = needle.parse::<u32>() {
            return Self::from_area_id(id).ok_or_else(|| UrlError::UnknownCity(s.to_string()));
        }

        Self::ALL
            .into_iter()
            .find(|city| city.slug() == needle || city.display_name().to_lowercase() == needle)
            .ok_or_else(|| UrlError::UnknownCity(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_city() {
        assert_eq!("stockholm".parse::<City>().unwrap(), City::Stockholm);
        assert_eq!("Linköping".parse::<City>().unwrap(), City::Linkoping);
        assert_eq!("LINKOPING".parse::<City>().unwrap(), City::Linkoping);
        assert_eq!("393".parse::<City>().unwrap(), City::Linkoping);
    }

    #[test]
    fn test_parse_unknown_city() {
        assert!(matches!(
            "gothenburg".parse::<City>(),
            Err(UrlError::UnknownCity(_))
        ));
        assert!("42".parse::<City>().is_err());
    }

    #[test]
    fn test_area_ids() {
        assert_eq!(City::Stockholm.area_id(), 1);
        assert_eq!(City::Linkoping.area_id(), 393);
        assert_eq!(City::from_area_id(1), Some(City::Stockholm));
    }
}
