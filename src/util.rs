//! Helpers shared by the stages: the identifier [`intern`]er, rendering of
//! trees and diagnostics in [`fmt`], and [`BreakableIteratorExt::up_to`], which
//! bounds the endless token stream of the lexer at `Eof`.

pub mod fmt;
pub mod intern;
#[cfg(test)]
pub(crate) mod test_utils;

/// Extends iterators with [`up_to`](BreakableIteratorExt::up_to).
pub trait BreakableIteratorExt<I>: Iterator
where
    I: Iterator,
{
    fn up_to<P>(self, stop_predicate: P) -> Break<I, P>
    where
        P: FnMut(&I::Item) -> bool;
}

impl<I> BreakableIteratorExt<I> for I
where
    I: Iterator,
{
    fn up_to<P>(self, stop_predicate: P) -> Break<I, P>
    where
        P: FnMut(&I::Item) -> bool,
    {
        Break {
            iter: self,
            stop_predicate,
            finished: false,
        }
    }
}

/// An iterator which yields the items of `iter` up to, and including, the
/// first one matching `stop_predicate`.
pub struct Break<I, P> {
    iter: I,
    stop_predicate: P,
    finished: bool,
}

impl<I, P> Iterator for Break<I, P>
where
    I: Iterator,
    P: FnMut(&I::Item) -> bool,
{
    type Item = I::Item;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let next = self.iter.next()?;
        self.finished = (self.stop_predicate)(&next);
        Some(next)
    }
}

#[cfg(test)]
mod tests {
    use crate::util::BreakableIteratorExt;

    #[test]
    fn test_up_to() {
        let items: Vec<_> = (0..10).up_to(|x| *x == 5).collect();
        assert_eq!(items, [0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_up_to_stops_an_endless_iterator() {
        let items: Vec<_> = std::iter::repeat(7).up_to(|x| *x == 7).collect();
        assert_eq!(items, [7]);
    }

    #[test]
    fn test_up_to_without_match() {
        let items: Vec<_> = (0..3).up_to(|x| *x == 10).collect();
        assert_eq!(items, [0, 1, 2]);
    }
}
