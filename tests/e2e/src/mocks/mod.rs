mod fixtures;

pub use fixtures::{
    context_match, donbas_gazetteer, event_match, frontline_meridian, DocBuilder,
    GazetteerBuilder,
};
