use std::cmp::Reverse;
use std::error::Error;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use itertools::Itertools;
use regex::Regex;
use thiserror::Error;

#[derive(Error, Debug)]
#[error("{0}")]
pub struct ParseError(pub String);

/// An NBA season identified by its start year, displayed as `2022-23`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Season(pub i32);

impl Season {
    pub fn start_year(&self) -> i32 {
        self.0
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:02}", self.0, (self.0 + 1) % 100)
    }
}

impl FromStr for Season {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let re = Regex::new(r"^([0-9]{4})-([0-9]{2})$").unwrap();
        let caps = re
            .captures(s)
            .ok_or_else(|| ParseError(format!("invalid season '{}', expected YYYY-YY", s)))?;
        let start: i32 = caps[1].parse().unwrap();
        let end: i32 = caps[2].parse().unwrap();
        if (start + 1) % 100 != end {
            return Err(ParseError(format!(
                "invalid season '{}', years are not consecutive",
                s
            )));
        }
        Ok(Season(start))
    }
}

/// The players listed under one `Season:` header of the roster file.
#[derive(Debug, Clone, PartialEq)]
pub struct SeasonRoster {
    pub season: Season,
    pub players: Vec<String>,
}

/// Parse a roster file: `Season: YYYY-YY` headers, one player name per line.
/// Lines of `=` separators are decorative and skipped, as are player lines
/// appearing before the first season header.
pub fn parse_roster(path: &Path) -> Result<Vec<SeasonRoster>, Box<dyn Error>> {
    let buffer = fs::read_to_string(path)?;
    parse_roster_str(&buffer)
}

pub fn parse_roster_str(buffer: &str) -> Result<Vec<SeasonRoster>, Box<dyn Error>> {
    let mut rosters: Vec<SeasonRoster> = Vec::new();
    for line in buffer.lines() {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("Season:") {
            let season: Season = rest.trim().parse()?;
            rosters.push(SeasonRoster {
                season,
                players: Vec::new(),
            });
        } else if !line.is_empty() && !line.starts_with('=') {
            if let Some(current) = rosters.last_mut() {
                current.players.push(line.to_string());
            }
        }
    }
    Ok(rosters)
}

/// Most recent season first, the order the jobs process them in.
pub fn sort_newest_first(rosters: &mut [SeasonRoster]) {
    rosters.sort_by_key(|r| Reverse(r.season));
}

/// Every player name in the file, sorted and deduplicated, ignoring season
/// structure entirely. The bio job wants one fetch per player no matter how
/// many seasons list them.
pub fn parse_names(path: &Path) -> Result<Vec<String>, Box<dyn Error>> {
    let buffer = fs::read_to_string(path)?;
    Ok(buffer
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('=') && !l.starts_with("Season:"))
        .map(str::to_string)
        .sorted()
        .dedup()
        .collect())
}

/// Filesystem-safe version of a player name, e.g. "Luka Doncic" -> "Luka_Doncic".
pub fn slugify(name: &str) -> String {
    let re = Regex::new(r"[^A-Za-z0-9]+").unwrap();
    re.replace_all(name, "_").trim_matches('_').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROSTER: &str = "\
Season: 2022-23
==================
Stephen Curry
Klay Thompson

Season: 2021-22
==================
Stephen Curry
Jordan Poole
";

    #[test]
    fn parse_seasons_and_players() -> Result<(), Box<dyn Error>> {
        let rosters = parse_roster_str(ROSTER)?;
        assert_eq!(rosters.len(), 2);
        assert_eq!(rosters[0].season, Season(2022));
        assert_eq!(rosters[0].players, vec!["Stephen Curry", "Klay Thompson"]);
        assert_eq!(rosters[1].players, vec!["Stephen Curry", "Jordan Poole"]);
        Ok(())
    }

    #[test]
    fn players_before_first_header_are_ignored() -> Result<(), Box<dyn Error>> {
        let rosters = parse_roster_str("Stray Player\nSeason: 2019-20\nJa Morant\n")?;
        assert_eq!(rosters.len(), 1);
        assert_eq!(rosters[0].players, vec!["Ja Morant"]);
        Ok(())
    }

    #[test]
    fn bad_season_header_is_an_error() {
        assert!(parse_roster_str("Season: 2022-24\nAnybody\n").is_err());
        assert!(parse_roster_str("Season: 22-23\nAnybody\n").is_err());
    }

    #[test]
    fn season_roundtrip() {
        let season: Season = "2022-23".parse().unwrap();
        assert_eq!(season, Season(2022));
        assert_eq!(season.to_string(), "2022-23");
        // century rollover
        assert_eq!("1999-00".parse::<Season>().unwrap().to_string(), "1999-00");
    }

    #[test]
    fn newest_first_ordering() -> Result<(), Box<dyn Error>> {
        let mut rosters = parse_roster_str("Season: 2010-11\nA\nSeason: 2015-16\nB\n")?;
        sort_newest_first(&mut rosters);
        assert_eq!(rosters[0].season, Season(2015));
        assert_eq!(rosters[1].season, Season(2010));
        Ok(())
    }

    #[test]
    fn names_are_unique_and_sorted() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("roster.txt");
        fs::write(&path, ROSTER)?;
        assert_eq!(
            parse_names(&path)?,
            vec!["Jordan Poole", "Klay Thompson", "Stephen Curry"]
        );
        Ok(())
    }

    #[test]
    fn slugs() {
        assert_eq!(slugify("Stephen Curry"), "Stephen_Curry");
        assert_eq!(slugify("Shaquille O'Neal"), "Shaquille_O_Neal");
        assert_eq!(slugify("Karl-Anthony Towns"), "Karl_Anthony_Towns");
        assert_eq!(slugify(" P.J. Tucker "), "P_J_Tucker");
    }
}
