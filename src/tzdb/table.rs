//! Binary search decision trees over the cities of each area.

use super::{BufferLimits, Dataset, symbol};
use std::{borrow::Cow, cmp::Ordering};

/// A decision node over an inclusive range of a sorted city list.
#[derive(Debug, Eq, PartialEq)]
pub enum Node<'a> {
    /// A range with one city.
    Leaf(&'a str),
    /// A range with two cities, tested in order by equality without a
    /// further split.
    Pair(&'a str, &'a str),
    /// A three-way comparison against the middle city of the range. Both
    /// sides are always non-empty.
    Split {
        pivot: &'a str,
        less: Box<Node<'a>>,
        greater: Box<Node<'a>>,
    },
}

impl<'a> Node<'a> {
    /// Builds the tree for `sorted[lower..=upper]`.
    ///
    /// The midpoint is biased towards `lower`, so an even-sized range puts
    /// the extra city on the greater side.
    fn build(sorted: &[&'a str], lower: usize, upper: usize) -> Self {
        if lower == upper {
            Node::Leaf(sorted[lower])
        } else if lower + 1 == upper {
            Node::Pair(sorted[lower], sorted[upper])
        } else {
            let middle = lower + (upper - lower) / 2;
            Node::Split {
                pivot: sorted[middle],
                less: Box::new(Self::build(sorted, lower, middle - 1)),
                greater: Box::new(Self::build(sorted, middle + 1, upper)),
            }
        }
    }

    /// Walks the tree the same way the generated code does, returning the
    /// matched city.
    pub fn find(&self, city: &str) -> Option<&'a str> {
        match self {
            Node::Leaf(only) => (*only == city).then_some(*only),
            Node::Pair(first, second) => {
                if *first == city {
                    Some(*first)
                } else if *second == city {
                    Some(*second)
                } else {
                    None
                }
            }
            Node::Split {
                pivot,
                less,
                greater,
            } => match city.cmp(pivot) {
                Ordering::Less => less.find(city),
                Ordering::Greater => greater.find(city),
                Ordering::Equal => Some(*pivot),
            },
        }
    }

    /// Whether this tree needs a comparison result variable.
    pub fn has_split(&self) -> bool {
        matches!(self, Node::Split { .. })
    }
}

/// The decision tree for one area.
#[derive(Debug)]
pub struct AreaTable<'a> {
    /// The area name.
    pub area: &'a str,
    /// The area’s cities in byte-wise ascending order.
    pub sorted: Vec<&'a str>,
    /// The search tree over `sorted`.
    pub root: Node<'a>,
}

impl<'a> AreaTable<'a> {
    fn new(area: &'a str, cities: &'a [String]) -> Self {
        let mut sorted = cities.iter().map(String::as_str).collect::<Vec<_>>();
        // `str` ordering is byte-wise, which is what `strcmp` does.
        sorted.sort();
        // A dataset never holds an area without at least one city.
        let root = Node::build(&sorted, 0, sorted.len() - 1);
        Self { area, sorted, root }
    }
}

/// The complete two-level lookup table.
#[derive(Debug)]
pub struct LookupTable<'a> {
    /// Areas in first-seen order. Dispatch over them is a linear scan.
    pub areas: Vec<AreaTable<'a>>,
    /// The namespace tag for symbols.
    pub prefix: &'a str,
    /// The symbol returned for unknown pairs.
    pub fallback: &'a str,
    /// Buffer sizes for the longest names.
    pub limits: BufferLimits,
}

impl<'a> LookupTable<'a> {
    /// Builds the table for a dataset.
    pub fn new(dataset: &'a Dataset, prefix: &'a str, fallback: &'a str) -> Self {
        let areas = dataset
            .areas()
            .map(|(area, cities)| AreaTable::new(area, cities))
            .collect::<Vec<_>>();
        Self {
            areas,
            prefix,
            fallback,
            limits: dataset.limits(),
        }
    }

    /// The symbol for an area/city pair.
    pub fn symbol(&self, area: &str, city: &str) -> String {
        symbol(self.prefix, area, city)
    }

    /// Finds the symbol for an area/city pair, or `None` if either is
    /// unknown.
    pub fn find(&self, area: &str, city: &str) -> Option<String> {
        let table = self.areas.iter().find(|table| table.area == area)?;
        table
            .root
            .find(city)
            .map(|city| self.symbol(table.area, city))
    }

    /// Looks up the symbol for an area/city pair, resolving unknown pairs to
    /// the fallback symbol.
    pub fn lookup(&self, area: &str, city: &str) -> Cow<'a, str> {
        self.find(area, city)
            .map_or(Cow::Borrowed(self.fallback), Cow::Owned)
    }
}
