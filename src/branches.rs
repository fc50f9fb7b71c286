//! Per-branch storage keyed by [`Branch`]

use crate::constants::Branch;
use serde::Serialize;
use std::ops::{Index, IndexMut};

/// One value for each of normal/professional/master
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Branches<T> {
    pub normal: T,
    pub professional: T,
    pub master: T,
}

impl<T> Branches<T> {
    pub fn from_fn(mut f: impl FnMut(Branch) -> T) -> Self {
        Self {
            normal: f(Branch::Normal),
            professional: f(Branch::Professional),
            master: f(Branch::Master),
        }
    }

    /// Iterate in wire order
    pub fn iter(&self) -> impl Iterator<Item = (Branch, &T)> {
        Branch::ALL.into_iter().map(move |b| (b, &self[b]))
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        [&self.normal, &self.professional, &self.master].into_iter()
    }

    pub fn map<U>(&self, mut f: impl FnMut(&T) -> U) -> Branches<U> {
        Branches::from_fn(|b| f(&self[b]))
    }
}

impl<T> Index<Branch> for Branches<T> {
    type Output = T;

    fn index(&self, branch: Branch) -> &T {
        match branch {
            Branch::Normal => &self.normal,
            Branch::Professional => &self.professional,
            Branch::Master => &self.master,
        }
    }
}

impl<T> IndexMut<Branch> for Branches<T> {
    fn index_mut(&mut self, branch: Branch) -> &mut T {
        match branch {
            Branch::Normal => &mut self.normal,
            Branch::Professional => &mut self.professional,
            Branch::Master => &mut self.master,
        }
    }
}
