use rand::Rng;

use super::{
    constraint::{Clock, Limit, Relation, Strictness, REFERENCE},
    dbm::{Canonical, DBM},
};

/// A random non-empty closed zone with finite limits in [-max, max].
pub(crate) fn random_zone<R: Rng>(rng: &mut R, dimensions: Clock, max: Limit) -> DBM<Canonical> {
    let mut dbm = DBM::init(dimensions);
    if dimensions < 2 {
        return dbm;
    }

    for _ in 0..rng.gen_range(0..dimensions as usize * 3) {
        let i = rng.gen_range(REFERENCE..dimensions);
        let j = rng.gen_range(REFERENCE..dimensions);
        if i == j {
            continue;
        }

        let limit = if i == REFERENCE {
            rng.gen_range(-max..=0)
        } else {
            rng.gen_range(-max..=max)
        };
        let strictness: Strictness = rng.gen();
        dbm = match dbm.clone().constrain(i, j, Relation::new(limit, strictness)) {
            Ok(constrained) => constrained,
            Err(_) => dbm,
        };
    }
    dbm
}

/// A random integer valuation in [0, max] with the reference clock at zero.
pub(crate) fn random_point<R: Rng>(rng: &mut R, dimensions: Clock, max: Limit) -> Vec<Limit> {
    (REFERENCE..dimensions)
        .map(|clock| {
            if clock == REFERENCE {
                0
            } else {
                rng.gen_range(0..=max)
            }
        })
        .collect()
}
