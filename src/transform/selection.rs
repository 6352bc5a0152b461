//! Page selections: `"1-3,5,8-"` style ranges or every Nth page.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use nom::{
    branch::alt,
    character::complete::{char, digit1, space0},
    combinator::{all_consuming, map, map_res, opt},
    multi::separated_list1,
    sequence::{delimited, pair, preceded},
    IResult,
};

use crate::error::{Error, Result};

/// One element of a range list. Page numbers are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageRange {
    /// `5`
    Single(usize),
    /// `2-4`, or `4-2` for the same pages in descending order
    Span(usize, usize),
    /// `8-`: page 8 through the last page
    From(usize),
}

/// A set of pages chosen by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageSelection {
    /// Every page
    All,
    /// Explicit pages, in request order
    Ranges(Vec<PageRange>),
    /// Pages N, 2N, 3N, ...
    Every(usize),
}

impl PageSelection {
    /// Explicit page numbers.
    pub fn pages(pages: impl IntoIterator<Item = usize>) -> Self {
        PageSelection::Ranges(pages.into_iter().map(PageRange::Single).collect())
    }

    /// Parse a comma separated list of pages and ranges such as `"1-3,5,8-"`.
    pub fn parse(input: &str) -> Result<Self> {
        match all_consuming(delimited(space0, range_list, space0))(input) {
            Ok((_, ranges)) => Ok(PageSelection::Ranges(ranges)),
            Err(_) => Err(Error::InvalidSelection(input.to_string())),
        }
    }

    /// Selected 1-based page numbers for a document of `page_count` pages.
    ///
    /// Explicit ranges come back in request order and may repeat; every-Nth and
    /// all-pages selections come back in document order.
    ///
    /// # Errors
    ///
    /// - [`Error::IndexOutOfRange`] for a page of 0 or past `page_count`
    /// - [`Error::InvalidSelection`] for `Every(0)`
    pub fn resolve(&self, page_count: usize) -> Result<Vec<usize>> {
        let check = |index: usize| {
            if index == 0 || index > page_count {
                Err(Error::IndexOutOfRange { index, page_count })
            } else {
                Ok(index)
            }
        };

        match self {
            PageSelection::All => Ok((1..=page_count).collect()),
            PageSelection::Every(0) => Err(Error::InvalidSelection("every 0".to_string())),
            PageSelection::Every(n) => Ok((1..=page_count).filter(|p| p % n == 0).collect()),
            PageSelection::Ranges(ranges) => {
                let mut pages = Vec::new();
                for range in ranges {
                    match *range {
                        PageRange::Single(p) => pages.push(check(p)?),
                        PageRange::Span(start, end) => {
                            check(start)?;
                            check(end)?;
                            if start <= end {
                                pages.extend(start..=end);
                            } else {
                                pages.extend((end..=start).rev());
                            }
                        },
                        PageRange::From(start) => {
                            check(start)?;
                            pages.extend(start..=page_count);
                        },
                    }
                }
                Ok(pages)
            },
        }
    }

    /// Pages not selected, in document order.
    pub fn complement(&self, page_count: usize) -> Result<Vec<usize>> {
        let selected: HashSet<usize> = self.resolve(page_count)?.into_iter().collect();
        Ok((1..=page_count).filter(|p| !selected.contains(p)).collect())
    }
}

impl FromStr for PageSelection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        PageSelection::parse(s)
    }
}

impl fmt::Display for PageSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageSelection::All => write!(f, "all pages"),
            PageSelection::Every(n) => write!(f, "every {}", n),
            PageSelection::Ranges(ranges) => {
                for (i, range) in ranges.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    match range {
                        PageRange::Single(p) => write!(f, "{}", p)?,
                        PageRange::Span(a, b) => write!(f, "{}-{}", a, b)?,
                        PageRange::From(a) => write!(f, "{}-", a)?,
                    }
                }
                Ok(())
            },
        }
    }
}

fn number(input: &str) -> IResult<&str, usize> {
    map_res(digit1, |digits: &str| digits.parse::<usize>())(input)
}

fn dash(input: &str) -> IResult<&str, char> {
    delimited(space0, char('-'), space0)(input)
}

fn range(input: &str) -> IResult<&str, PageRange> {
    alt((
        map(pair(number, preceded(dash, number)), |(a, b)| PageRange::Span(a, b)),
        map(pair(number, opt(dash)), |(a, open)| match open {
            Some(_) => PageRange::From(a),
            None => PageRange::Single(a),
        }),
    ))(input)
}

fn range_list(input: &str) -> IResult<&str, Vec<PageRange>> {
    separated_list1(delimited(space0, char(','), space0), range)(input)
}
