mod cancel;
mod locking;
mod rollback;
