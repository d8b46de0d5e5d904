mod helpers;
mod test_apply;
mod test_promote;
