/*!
Normalization, filtering and export of door-to-door canvassing lists.

A [`Tracker`] holds the contact records of a campaign together with the current
filter, sort and page settings. It reads voter lists exported by spreadsheets (see
the [`manual`] for the accepted columns), keeps the visit status and remarks of
every contact, and writes subsets of the list back to CSV. Every change is written
to a [`KeyValueStore`] before the command returns.

```
use canvass_core::*;

let mut tracker = Tracker::open(MemoryStore::new());
tracker.import("Nom;Prénom;Bureau;Statut\nDupont;Jean;101;Favorable\n")?;
tracker.apply_filter(None, Some("jean"));
let view = tracker.view();
assert_eq!(view.page_rows()[0].status, Status::Favorable);
# Ok::<(), CanvassError>(())
```
*/

mod config;
mod error;
pub mod export;
pub mod field_mapper;
pub mod manual;
pub mod normalizer;
pub mod store;
mod tracker;
pub mod view;

pub use crate::config::*;
pub use crate::error::{CanvassError, CanvassResult, KvError};
pub use crate::export::{ExportKind, ExportSet};
pub use crate::store::{KeyValueStore, MemoryStore, Store};
pub use crate::tracker::*;
pub use crate::view::{PageInfo, View};
