mod halt;
mod roundtrip;
